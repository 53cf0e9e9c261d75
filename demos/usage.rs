use std::sync::Arc;

use swift_catalog::{
    connect, country_name_for_iso2, BranchRepository, Config, HeadquartersRepository,
    QueryExecutor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "swift-catalog.yaml".to_string());
    let config = Config::load(&path)?;
    let db = Arc::new(connect(&config.database).await?);

    let headquarters = HeadquartersRepository::new(db.clone())?;
    let branches = BranchRepository::new(db)?;

    for hq in headquarters.find_all_for_country("PL").await? {
        let offices = branches.find_all_for_swift(&hq.swift_code).await?;
        println!(
            "{} {} ({} branches)",
            hq.swift_code,
            hq.bank_name.unwrap_or_default(),
            offices.len()
        );
    }

    println!("PL: {}", country_name_for_iso2(&headquarters, &branches, "PL").await?);
    println!("newest: {}", headquarters.find_last(5).await?.len());
    Ok(())
}
