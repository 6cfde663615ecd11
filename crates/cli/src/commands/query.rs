//! `recall query` / `recall hops`: Run the retrieval pipeline.

use recall_retrieval::{CombinedEntry, ContextRequest};

pub async fn run(query: &str, max_tokens: Option<usize>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let router = super::pipeline().await?;

    let mut request = ContextRequest::new(query);
    request.max_tokens = max_tokens;
    let response = router.route(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let kind = response
        .classification
        .query_type
        .map_or("unknown", |t| t.as_str());
    println!("🔍 {query}");
    println!(
        "   type: {kind} ({:.2}) — {}",
        response.classification.confidence, response.routing.reasoning
    );
    for outcome in &response.routing.outcomes {
        match &outcome.error {
            None => println!("   ✅ {:<11} {} items, {}ms", outcome.layer.as_str(), outcome.items, outcome.elapsed_ms),
            Some(e) => println!("   ⚠️  {:<11} {e}", outcome.layer.as_str()),
        }
    }
    println!();

    if response.context.is_empty() {
        println!("(no context found)");
    }
    for (i, item) in response.context.iter().enumerate() {
        println!("{:>2}. [{} {:.2}] {}", i + 1, item.layer, item.score, item.text());
    }

    let s = &response.stats;
    println!(
        "\n{} of {} items, ~{} tokens, {}ms{}",
        s.final_items,
        s.total_items,
        s.estimated_tokens,
        s.total_ms,
        if s.cache_hit { " (cached)" } else { "" }
    );
    Ok(())
}

pub async fn run_hops(sub_queries: &[String], max_tokens: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let router = super::pipeline().await?;
    let entries = router.route_hops(sub_queries, max_tokens).await?;

    for entry in &entries {
        match entry {
            CombinedEntry::Separator { sub_query, .. } => println!("── {sub_query}"),
            CombinedEntry::Item(item) => println!("   [{} {:.2}] {}", item.layer, item.score, item.text()),
        }
    }
    if entries.is_empty() {
        println!("(no context found)");
    }
    Ok(())
}
