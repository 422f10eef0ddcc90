//! CLI `doctor` command — print the resolved configuration and probe the store.

use anyhow::{Context, Result};

use nexus_cloud::config::{NexusConfig, StoreBackend};
use nexus_cloud::store;

/// Print the effective configuration and check the store answers.
pub async fn doctor(config: &NexusConfig) -> Result<()> {
    println!("NEXUS Health Report");
    println!("===================");
    println!();
    println!("Listen address:    {}", config.bind_addr());
    println!("Error status:      {:?}", config.server.error_status);
    println!("Capture failures:  {:?}", config.enhance.on_capture_error);
    println!();

    match config.store.backend {
        StoreBackend::Postgrest => {
            println!("Store backend:     postgrest");
            println!("  URL:             {}", display_or_unset(&config.store.url));
            println!("  Service key:     {}", mask_key(&config.store.service_key));
            println!("  Table:           {}", config.store.table);
            println!("  Timeout:         {}s", config.store.timeout_secs);
        }
        StoreBackend::Sqlite => {
            println!("Store backend:     sqlite");
            println!("  Database:        {}", config.store.resolved_db_path().display());
        }
    }
    println!();

    let store = store::create_store(&config.store).context("failed to open store")?;
    match store.probe().await {
        Ok(()) => println!("Store probe:       PASSED"),
        Err(e) => {
            println!("Store probe:       FAILED ({e})");
            println!();
            println!("Check SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY or the [store] section");
            println!("of the config file, and that the `{}` table exists.", config.store.table);
        }
    }

    Ok(())
}

fn display_or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Show only the last four characters of a secret.
fn mask_key(key: &str) -> String {
    if key.is_empty() {
        return "(not set)".into();
    }
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_key_hides_all_but_tail() {
        assert_eq!(mask_key(""), "(not set)");
        assert_eq!(mask_key("abcdefgh"), "****efgh");
        assert_eq!(mask_key("ab"), "****ab");
    }
}
