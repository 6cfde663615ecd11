//! `recall status`: Show effective configuration.

use recall_config::AppConfig;
use recall_core::layer::MemoryLayer;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let c = &config.classifier;

    println!("🧠 recall Status");
    println!("================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Classifier:   {}", c.backend);
    if c.backend == "llm" {
        println!("  Provider:     {}", c.provider);
        println!("  Model:        {}", c.model);
        println!("  API key:      {}", if c.api_key.is_some() { "set" } else { "not set" });
    }
    println!("  Timeouts:     classifier {}ms, layer {}ms", c.timeout_ms, config.router.layer_timeout_ms);
    for (layer, ms) in &config.router.layer_timeouts {
        println!("                {layer} {ms}ms");
    }
    println!(
        "  Cache:        {}",
        if config.router.cache_enabled {
            format!("enabled ({}s TTL, {} entries)", config.router.cache_ttl_secs, config.router.cache_capacity)
        } else {
            "disabled".into()
        }
    );
    println!(
        "  Fusion:       max_tokens={}, min_score={:.2}, diversity={:.2}, dedup={:.2}",
        config.fusion.max_tokens,
        config.fusion.min_score,
        config.fusion.diversity_weight,
        config.fusion.deduplication_threshold
    );
    println!("  Debug:        {}", if config.debug { "on" } else { "off" });

    let data_dir = config.layers.data_dir();
    println!("\n  Layers ({}):", data_dir.display());
    for layer in MemoryLayer::ALL {
        let path = data_dir.join(format!("{layer}.jsonl"));
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let records = content.lines().filter(|l| !l.trim().is_empty()).count();
                println!("    ✅ {:<11} {records} records", layer.as_str());
            }
            Err(_) => println!("    ·  {:<11} (no file)", layer.as_str()),
        }
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `recall onboard` first");
    }

    Ok(())
}
