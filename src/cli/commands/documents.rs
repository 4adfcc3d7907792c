//! Documents command - list the corpus.

use serde::Serialize;

use crate::config::Settings;
use crate::documents::DocumentFormat;
use crate::services::open_corpus;

#[derive(Serialize)]
struct Listing {
    name: String,
    supported: bool,
    uri: String,
}

pub fn run(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let corpus = open_corpus(settings)?;

    let mut listings = Vec::new();
    for name in corpus.list()? {
        listings.push(Listing {
            supported: DocumentFormat::from_name(&name).is_some(),
            uri: corpus.uri(&name)?,
            name,
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
        return Ok(());
    }

    println!("Corpus: {}", corpus.location());
    if listings.is_empty() {
        println!("No documents.");
    }
    for listing in &listings {
        if listing.supported {
            println!("  {}", listing.name);
        } else {
            println!("  {} (unsupported, skipped when indexing)", listing.name);
        }
    }
    Ok(())
}
