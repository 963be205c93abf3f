//! Browser Fingerprint Spoofing
//!
//! Mirror sites sit behind basic bot filters that reject clients without a
//! plausible browser header set. Every adapter client picks one profile at
//! construction and sends it on every request.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT,
};
use serde::Deserialize;

/// Chrome `(major, full)` versions
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.6778.264"),
    ("132", "132.0.6834.159"),
    ("133", "133.0.6943.141"),
    ("134", "134.0.6998.165"),
];

const FIREFOX_VERSIONS: &[&str] = &["133.0", "134.0", "135.0", "136.0"];

/// Safari `(version, webkit)` pairs
const SAFARI_VERSIONS: &[(&str, &str)] = &[("17.6", "605.1.15"), ("18.2", "605.1.15"), ("18.3", "605.1.15")];

const ACCEPT_LANGUAGES: &[&str] = &[
    "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7",
    "it-IT,it;q=0.9",
    "it,en-US;q=0.9,en;q=0.8",
    "en-US,en;q=0.9,it;q=0.8",
];

/// Which browser family to impersonate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impersonate {
    #[default]
    Chrome,
    Firefox,
    Safari,
    /// Weighted by desktop market share
    Random,
}

impl Impersonate {
    /// Generate a fresh profile for this browser family.
    #[must_use]
    pub fn profile(self) -> BrowserProfile {
        match self {
            Impersonate::Chrome => chrome_profile(),
            Impersonate::Firefox => firefox_profile(),
            Impersonate::Safari => safari_profile(),
            Impersonate::Random => random_profile(),
        }
    }
}

impl std::str::FromStr for Impersonate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "safari" => Ok(Self::Safari),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown browser profile: {other}")),
        }
    }
}

/// Browser profile with realistic fingerprint
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    pub accept_encoding: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_mobile: String,
    pub sec_ch_ua_platform: String,
}

#[derive(Debug, Clone, Copy)]
enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    fn random() -> Self {
        // Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

fn pick<T: Copy>(items: &[T], fallback: T) -> T {
    items.choose(&mut rand::thread_rng()).copied().unwrap_or(fallback)
}

fn random_accept_language() -> String {
    pick(ACCEPT_LANGUAGES, "it-IT,it;q=0.9").to_string()
}

/// Generate a realistic Chrome browser profile
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let platform = Platform::random();
    let (major, full) = pick(CHROME_VERSIONS, ("134", "134.0.6998.165"));

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7".to_string(),
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br, zstd".to_string(),
        sec_ch_ua: format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        ),
        sec_ch_ua_mobile: "?0".to_string(),
        sec_ch_ua_platform: platform.sec_ch_platform().to_string(),
    }
}

/// Generate a realistic Firefox browser profile
#[must_use]
pub fn firefox_profile() -> BrowserProfile {
    let platform = Platform::random();
    let version = pick(FIREFOX_VERSIONS, "136.0");

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}; rv:{version}) Gecko/20100101 Firefox/{version}",
            platform.os_string()
        ),
        accept:
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8"
                .to_string(),
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br, zstd".to_string(),
        // Firefox doesn't send Sec-CH-UA headers
        sec_ch_ua: String::new(),
        sec_ch_ua_mobile: String::new(),
        sec_ch_ua_platform: String::new(),
    }
}

/// Generate a realistic Safari browser profile (always macOS)
#[must_use]
pub fn safari_profile() -> BrowserProfile {
    let (version, webkit) = pick(SAFARI_VERSIONS, ("18.3", "605.1.15"));

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/{webkit} (KHTML, like Gecko) Version/{version} Safari/{webkit}"
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        accept_language: random_accept_language(),
        accept_encoding: "gzip, deflate, br".to_string(),
        sec_ch_ua: String::new(),
        sec_ch_ua_mobile: String::new(),
        sec_ch_ua_platform: String::new(),
    }
}

/// Generate a random browser profile (weighted by market share)
#[must_use]
pub fn random_profile() -> BrowserProfile {
    // Chrome 65%, Safari 20%, Firefox 15%
    let roll: f32 = rand::thread_rng().gen();
    if roll < 0.65 {
        chrome_profile()
    } else if roll < 0.85 {
        safari_profile()
    } else {
        firefox_profile()
    }
}

impl BrowserProfile {
    /// Convert profile to reqwest `HeaderMap`.
    ///
    /// Empty values are omitted, as are values that are not valid header text.
    pub fn to_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let dynamic = [
            (USER_AGENT, &self.user_agent),
            (ACCEPT, &self.accept),
            (ACCEPT_LANGUAGE, &self.accept_language),
            (ACCEPT_ENCODING, &self.accept_encoding),
            (HeaderName::from_static("sec-ch-ua"), &self.sec_ch_ua),
            (HeaderName::from_static("sec-ch-ua-mobile"), &self.sec_ch_ua_mobile),
            (HeaderName::from_static("sec-ch-ua-platform"), &self.sec_ch_ua_platform),
        ];
        for (name, value) in dynamic {
            if value.is_empty() {
                continue;
            }
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.insert(name, value);
            }
        }

        // Top-level navigation, as a browser tab would send it
        headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
        headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

        headers
    }
}
