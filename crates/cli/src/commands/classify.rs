//! `recall classify`: Show how a query is classified.

use recall_config::AppConfig;
use recall_retrieval::QueryClassifier;

pub async fn run(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let classifier = QueryClassifier::from_config(&config.classifier)?;
    classifier
        .init()
        .await
        .map_err(|e| format!("Failed to initialize classifier: {e}"))?;

    let result = classifier.classify(query).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
