use mirrorscout::SiteKey;

use super::Context;

pub fn cmd_sites(ctx: &Context) {
    let path = ctx.sites_path();
    let sites = match ctx.sites() {
        Ok(sites) => Some(sites),
        Err(e) => {
            println!("⚠️  {e:#}\n");
            None
        }
    };

    println!("📋 Sites document: {}\n", path.display());

    for key in SiteKey::ALL {
        let flags = ctx.settings.site_flags(key.document_key());
        let entry = sites.as_ref().and_then(|s| s.entry(key.document_key()));

        let status = if !flags.enabled {
            "disabled"
        } else if entry.is_none() {
            "missing"
        } else {
            "enabled"
        };
        println!("{key} [{status}]");
        println!(
            "   URL: {}",
            entry.map_or("-", |e| e.url.as_str())
        );
        if let Some(cookies) = entry.and_then(|e| e.cookies.as_ref()) {
            let set = cookies.values().filter(|v| v.is_some()).count();
            println!("   Cookies: {set}/{} set", cookies.len());
        }
        println!("   Proxy: {}", if flags.proxy { "yes" } else { "no" });
        println!(
            "   Forward proxy: {}",
            if flags.forward_proxy { "yes" } else { "no" }
        );
        println!();
    }
}
