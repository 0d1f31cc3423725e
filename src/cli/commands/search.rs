use crate::domain::WorkType;
use crate::state::AppState;

pub async fn cmd_search(state: &AppState, work_type: WorkType, query: &str) -> anyhow::Result<()> {
    println!("Searching for {work_type}: {query}");

    let found = match work_type {
        WorkType::Drama => state.catalog.search_work(query).await?,
        WorkType::Movie => state.catalog.search_movie(query).await?,
    };

    let Some(id) = found else {
        println!("No {work_type} found matching '{query}'");
        return Ok(());
    };

    println!("Best match: work {id}");
    println!();
    match work_type {
        WorkType::Drama => println!("To store its seasons: dramawatch ingest {id}"),
        WorkType::Movie => println!("To store it: dramawatch ingest-movie {id}"),
    }

    Ok(())
}
