//! Example: Extract text from a few URLs and display the results
//!
//! Run with: cargo run -p linktext --example fetch_urls [URL...]
//!
//! Honors FIRECRAWL_API_KEY, FIRECRAWL_BASE_URL, LINKTEXT_CACHE_DIR and
//! LINKTEXT_USER_AGENT. Set RUST_LOG=linktext=debug to see provider dispatch.

use linktext::{ContentOptions, LinkClientBuilder};
use tracing_subscriber::EnvFilter;

const DEFAULT_URLS: &[&str] = &[
    "https://example.com",
    "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "https://blog.rust-lang.org/",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = match LinkClientBuilder::from_env()
        .default_options(ContentOptions {
            max_characters: Some(600),
            ..Default::default()
        })
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to build client: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let urls: Vec<&str> = if args.is_empty() {
        DEFAULT_URLS.to_vec()
    } else {
        args.iter().map(String::as_str).collect()
    };

    println!("LinkText URL Examples");
    println!("=====================\n");

    for (i, url) in urls.iter().enumerate() {
        println!("{}. {}", i + 1, url);
        match client.fetch(url).await {
            Ok(content) => {
                println!("   Strategy: {:?}", content.diagnostics.strategy);
                println!("   Title:    {}", content.title.as_deref().unwrap_or("-"));
                println!("   Site:     {}", content.site_name.as_deref().unwrap_or("-"));
                println!(
                    "   Size:     {} chars, {} words{}",
                    content.total_characters,
                    content.word_count,
                    if content.truncated { " (truncated)" } else { "" }
                );
                if let Some(source) = &content.transcript_source {
                    println!(
                        "   Transcript: {} ({} lines)",
                        source,
                        content.transcript_lines.unwrap_or(0)
                    );
                }
                if let Some(notes) = &content.diagnostics.transcript.notes {
                    println!("   Notes:    {}", notes);
                }
                let preview: String = content.content.chars().take(160).collect();
                println!("   Preview:  {}\n", preview.replace('\n', " "));
            }
            Err(e) => println!("   Error: {}\n", e),
        }
    }
}
