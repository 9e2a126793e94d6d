//! Provider signal tables (spec.md §4.3).

use webpeel_types::ChallengeType;

/// A single lexical/structural marker that contributes to a provider's
/// score when found in the raw HTML (or, for `TitleContains`, the parsed
/// `<title>` text).
pub enum Needle {
    Html(&'static str),
    TitleContains(&'static str),
}

pub struct SignalSpec {
    pub name: &'static str,
    pub needle: Needle,
    /// Near-dispositive: this signal alone is strong enough that matching
    /// it counts double toward the "N of M signals" threshold.
    pub dispositive: bool,
}

pub struct ProviderSignature {
    pub provider: ChallengeType,
    pub signals: &'static [SignalSpec],
}

macro_rules! sig {
    ($name:expr, html $needle:expr) => {
        SignalSpec {
            name: $name,
            needle: Needle::Html($needle),
            dispositive: false,
        }
    };
    ($name:expr, html $needle:expr, dispositive) => {
        SignalSpec {
            name: $name,
            needle: Needle::Html($needle),
            dispositive: true,
        }
    };
    ($name:expr, title $needle:expr, dispositive) => {
        SignalSpec {
            name: $name,
            needle: Needle::TitleContains($needle),
            dispositive: true,
        }
    };
}

pub static CLOUDFLARE: &[SignalSpec] = &[
    sig!("cf-turnstile", html "cf-turnstile"),
    sig!("cdn-cgi-challenge-platform", html "/cdn-cgi/challenge-platform/"),
    sig!("cf_chl_opt", html "cf_chl_opt"),
    sig!("just-a-moment-title", title "just a moment", dispositive),
    sig!("cf-ray", html "cf-ray"),
    sig!("ray-id-text", html "ray id"),
    sig!("cf-error-overview", html "cf-error-overview"),
    sig!("attention-required", html "attention required"),
];

pub static PERIMETERX: &[SignalSpec] = &[
    sig!("_pxAppId", html "_pxappid"),
    sig!("_pxUuid", html "_pxuuid"),
    sig!("px-captcha", html "#px-captcha"),
    sig!("_pxCaptcha", html "_pxcaptcha"),
    sig!("_px3", html "_px3"),
    sig!("_pxvid", html "_pxvid"),
    sig!("press-and-hold", html "press & hold to confirm", dispositive),
];

pub static AKAMAI: &[SignalSpec] = &[
    sig!("akamaized-akam-path", html "akamaized.net/akam/"),
    sig!("bmak-js", html "bmak.js"),
    sig!("_bm_sz", html "_bm_sz"),
    sig!("ak_bmsc", html "ak_bmsc"),
];

pub static DATADOME: &[SignalSpec] = &[
    sig!("ct-datadome-co", html "ct.datadome.co"),
    sig!("captcha-delivery", html "captcha-delivery.com"),
    sig!("ddjskey", html "ddjskey"),
    sig!("datadome-captcha", html "datadome-captcha"),
];

pub static INCAPSULA: &[SignalSpec] = &[
    sig!("incapsula-js", html "incapsula.js"),
    sig!("incap-ses", html "incap_ses_"),
    sig!("visid-incap", html "visid_incap_"),
    sig!("incapsula-incident-id", html "incapsula incident id"),
];

pub static PROVIDERS: &[ProviderSignature] = &[
    ProviderSignature {
        provider: ChallengeType::Cloudflare,
        signals: CLOUDFLARE,
    },
    ProviderSignature {
        provider: ChallengeType::Perimeterx,
        signals: PERIMETERX,
    },
    ProviderSignature {
        provider: ChallengeType::Akamai,
        signals: AKAMAI,
    },
    ProviderSignature {
        provider: ChallengeType::Datadome,
        signals: DATADOME,
    },
    ProviderSignature {
        provider: ChallengeType::Incapsula,
        signals: INCAPSULA,
    },
];

/// Generic-block lexical markers (spec.md §4.3 "Generic block").
pub static GENERIC_BLOCK_PHRASES: &[&str] = &[
    "access denied",
    "verify you are human",
    "blocked",
    "bot protection",
    "captcha",
    "please enable javascript and cookies",
];
