use std::sync::Arc;

use anyhow::{bail, Result};

use mirrorscout::{AcceleratedClient, DomainRefresher};

use super::Context;

pub async fn cmd_refresh(ctx: &Context, dry_run: bool) -> Result<()> {
    let settings = &ctx.settings.domains;
    if settings.sources.is_empty() {
        bail!("no [[domains.sources]] configured");
    }

    let path = ctx.sites_path();
    let mut sites = ctx.sites()?;

    let client = AcceleratedClient::new(ctx.settings.client_options())?;
    let report = DomainRefresher::new(Arc::new(client))
        .refresh(settings, &mut sites)
        .await?;

    for (site, url) in &report.updated {
        println!("🔄 {site}: {url}");
    }
    for site in &report.cookies_filled {
        println!("🍪 {site}: null cookies filled");
    }
    for (site, reason) in &report.skipped {
        println!("⚠️  {site}: skipped ({reason})");
    }

    if dry_run {
        println!("\nDry run, {} left unchanged", path.display());
    } else if report.is_empty() {
        println!("\nNothing to update");
    } else {
        sites.save(&path)?;
        println!("\n💾 Saved {}", path.display());
    }

    Ok(())
}
