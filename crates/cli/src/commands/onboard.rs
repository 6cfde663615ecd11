//! `recall onboard`: First-time setup.

use recall_config::AppConfig;
use recall_core::layer::MemoryLayer;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    println!("🧠 recall — First-Time Setup");
    println!("============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let data_dir = config.layers.data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        println!("✅ Created layer data directory: {}", data_dir.display());
    }

    println!("\n📝 Next steps:");
    println!("   Each layer reads one JSON-lines file from the data directory:");
    for layer in MemoryLayer::ALL {
        println!("     {}", data_dir.join(format!("{layer}.jsonl")).display());
    }
    println!("   One record per line: {{\"content\": \"...\", \"timestamp\": \"2026-01-01T00:00:00Z\"}}");
    println!("   Then try: recall query \"Continue working on authentication\"");

    Ok(())
}
