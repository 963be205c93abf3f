use std::sync::Arc;

use anyhow::{bail, Result};

use mirrorscout::{
    build_adapter, build_adapters, race, race_query, ContentId, ContentQuery, Resolution,
    SiteAdapter, SiteKey, TmdbMetadata,
};

use super::Context;

pub async fn cmd_resolve(ctx: &Context, id: &str, site: Option<&str>, all: bool) -> Result<()> {
    // Reject malformed ids before touching the network
    ContentId::parse(id)?;

    let Some(api_key) = ctx.env.tmdb_api_key.as_deref() else {
        bail!("TMDB_API_KEY is not set");
    };
    let metadata = TmdbMetadata::new(api_key, ctx.settings.tmdb_language.as_str())?;
    let adapters = adapters(ctx, site)?;

    print_resolution(&race(&metadata, &adapters, id).await, all)
}

pub async fn cmd_lookup(
    ctx: &Context,
    title: &str,
    episode: Option<(u32, u32)>,
    site: Option<&str>,
    all: bool,
) -> Result<()> {
    let query = match episode {
        Some((season, episode)) => ContentQuery::episode(title, season, episode),
        None => ContentQuery::movie(title),
    };
    let adapters = adapters(ctx, site)?;

    print_resolution(&race_query(&adapters, &query).await, all)
}

fn adapters(ctx: &Context, site: Option<&str>) -> Result<Vec<Arc<dyn SiteAdapter>>> {
    let sites = ctx.sites()?;

    if let Some(name) = site {
        let key: SiteKey = name.parse()?;
        return Ok(vec![build_adapter(key, &ctx.settings, &sites, &ctx.env)?]);
    }

    let adapters = build_adapters(&ctx.settings, &sites, &ctx.env);
    if adapters.is_empty() {
        bail!("no sites enabled and configured");
    }
    Ok(adapters)
}

fn print_resolution(resolution: &Resolution, all: bool) -> Result<()> {
    match resolution {
        Resolution::Found { site, links } => {
            eprintln!("✅ Found on {site}");
            if all {
                for link in links {
                    println!("{}\t{}", link.url, link.quality);
                }
            } else if let Some(best) = links.first() {
                println!("{}", best.url);
            }
            Ok(())
        }
        Resolution::NotFound(stage) => bail!("not found (gave up at {stage})"),
    }
}
