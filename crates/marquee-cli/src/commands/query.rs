use anyhow::{bail, Context, Result};
use marquee_core::model::EnrichedMovie;
use marquee_core::queries::QueryOutput;
use marquee_core::{CatalogQuery, Database};
use std::path::Path;

/// Run one of the catalog queries and print its result (or its SQL).
pub fn run_query(db_path: &Path, query: CatalogQuery, show_sql: bool) -> Result<()> {
    if show_sql {
        println!("{};", query.sql());
        return Ok(());
    }

    if !db_path.exists() {
        bail!(
            "No catalog at {}. Run `marquee run` or `marquee init` first.",
            db_path.display()
        );
    }

    let db = Database::open(db_path)?;
    let output = db
        .run_query(query)
        .with_context(|| format!("Query '{query}' failed"))?;

    match output {
        QueryOutput::Tables(names) => {
            for name in names {
                println!("{name}");
            }
        }
        QueryOutput::Count(count) => println!("{count}"),
        QueryOutput::Movies(movies) => print_movies(&movies),
    }
    Ok(())
}

fn print_movies(movies: &[EnrichedMovie]) {
    println!(
        "{:>8}  {:>4}  {:>4}  {:<10}  {}",
        "movieId", "year", "imdb", "imdb_id", "title"
    );
    for movie in movies {
        println!(
            "{:>8}  {:>4}  {:>4}  {:<10}  {}",
            movie.movie_id,
            movie.year.map(|y| y.to_string()).unwrap_or_default(),
            movie
                .imdb_rating
                .map(|r| format!("{r:.1}"))
                .unwrap_or_default(),
            movie.imdb_id.as_deref().unwrap_or(""),
            movie.title.as_deref().unwrap_or("")
        );
    }
    println!("({} rows)", movies.len());
}
