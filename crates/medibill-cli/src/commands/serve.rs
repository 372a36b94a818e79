//! Server command implementation

use std::path::Path;

use anyhow::Result;
use medibill_core::config::GEMINI_API_KEY_VAR;
use medibill_core::{AppConfig, BackendKind};

pub async fn cmd_serve(
    config: AppConfig,
    host: &str,
    port: u16,
    no_auth: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting MediBill web server...");
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    match config.backend {
        BackendKind::Gemini if config.has_credential() => {
            println!("   🤖 Model: {} ({})", config.gemini.model, config.gemini.host);
        }
        BackendKind::Gemini => {
            println!(
                "   ⚠️  {} not set - uploads will fail with a configuration error",
                GEMINI_API_KEY_VAR
            );
        }
        BackendKind::Mock => {
            println!("   🧪 Model: mock backend (AI_BACKEND=mock)");
        }
    }
    println!(
        "   📎 Upload limit: {} MB",
        config.upload.max_size_bytes / 1024 / 1024
    );

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: email/password sessions (in-memory)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let server_config = medibill_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins: vec![],
        max_upload_size: config.upload.max_size_bytes,
    };

    let static_dir_str = static_dir.map(|p| p.to_string_lossy().to_string());
    medibill_server::serve_with_config(
        config,
        host,
        port,
        static_dir_str.as_deref(),
        server_config,
    )
    .await
}
