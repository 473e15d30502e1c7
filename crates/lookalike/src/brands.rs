//! Curated brand index
//!
//! Canonical domains of frequently impersonated brands, grouped by category.
//! Loaded once at startup and read-only afterwards; categories exist purely
//! for reporting.

/// A reporting category and its canonical brand domains
pub struct BrandCategory {
    pub name: &'static str,
    pub domains: &'static [&'static str],
}

pub const BRAND_INDEX: &[BrandCategory] = &[
    BrandCategory {
        name: "financial",
        domains: &[
            "paypal.com", "chase.com", "bankofamerica.com", "wellsfargo.com",
            "capitalone.com", "citi.com", "usbank.com", "barclays.com",
            "hsbc.com", "americanexpress.com", "discover.com", "ally.com",
            "goldmansachs.com", "morganstanley.com", "schwab.com", "fidelity.com",
            "vanguard.com", "etrade.com", "tdameritrade.com", "robinhood.com",
            "coinbase.com", "binance.com", "kraken.com", "gemini.com",
            "stripe.com", "square.com", "venmo.com", "cashapp.com",
            "transferwise.com", "revolut.com", "monzo.com", "n26.com",
            "santander.com", "bbva.com", "bnpparibas.com", "dbs.com",
            "standardchartered.com", "rbs.com", "lloydsbank.com", "nationwide.com",
            "pnc.com", "truist.com", "regions.com", "suntrust.com",
            "navyfederal.com", "usaa.com", "keybank.com", "bbt.com",
            "fifth-third.com", "citizensbank.com",
        ],
    },
    BrandCategory {
        name: "tech",
        domains: &[
            "google.com", "microsoft.com", "apple.com", "amazon.com",
            "facebook.com", "meta.com", "instagram.com", "whatsapp.com",
            "twitter.com", "x.com", "linkedin.com", "youtube.com",
            "netflix.com", "spotify.com", "adobe.com", "salesforce.com",
            "oracle.com", "ibm.com", "sap.com", "cisco.com",
            "intel.com", "nvidia.com", "amd.com", "dell.com",
            "hp.com", "lenovo.com", "asus.com", "samsung.com",
            "sony.com", "lg.com", "panasonic.com", "toshiba.com",
            "alibaba.com", "tencent.com", "baidu.com", "jd.com",
            "zoom.com", "slack.com", "dropbox.com", "box.com",
            "github.com", "gitlab.com", "bitbucket.com", "atlassian.com",
            "asana.com", "trello.com", "notion.com", "monday.com",
            "shopify.com", "squarespace.com", "wix.com", "wordpress.com",
        ],
    },
    BrandCategory {
        name: "email",
        domains: &[
            "gmail.com", "outlook.com", "yahoo.com", "protonmail.com",
            "icloud.com", "aol.com", "hotmail.com", "live.com",
            "mail.com", "zoho.com", "yandex.com", "gmx.com",
            "tutanota.com", "fastmail.com", "hushmail.com", "runbox.com",
            "mailbox.org", "posteo.de", "mailfence.com", "startmail.com",
            "telegram.com", "signal.org", "discord.com", "skype.com",
            "viber.com", "line.me", "wechat.com", "kakao.com",
            "messenger.com", "snapchat.com",
        ],
    },
    BrandCategory {
        name: "ecommerce",
        domains: &[
            "ebay.com", "walmart.com", "target.com", "bestbuy.com",
            "homedepot.com", "lowes.com", "costco.com", "macys.com",
            "nordstrom.com", "kohls.com", "jcpenney.com", "aliexpress.com",
            "etsy.com", "wayfair.com", "overstock.com", "newegg.com",
            "zappos.com", "chewy.com", "instacart.com", "doordash.com",
            "ubereats.com", "grubhub.com", "postmates.com", "seamless.com",
            "deliveroo.com", "just-eat.com", "booking.com", "expedia.com",
            "airbnb.com", "hotels.com", "trivago.com", "kayak.com",
            "priceline.com", "orbitz.com", "travelocity.com", "hotwire.com",
            "tripadvisor.com", "vrbo.com",
        ],
    },
    BrandCategory {
        name: "social",
        domains: &[
            "tiktok.com", "pinterest.com", "reddit.com", "tumblr.com",
            "flickr.com", "medium.com", "quora.com", "stackoverflow.com",
            "behance.net", "dribbble.com", "vimeo.com", "twitch.tv",
            "dailymotion.com", "soundcloud.com", "mixcloud.com", "mastodon.social",
            "threads.net", "bluesky.social", "truthsocial.com", "parler.com",
        ],
    },
    BrandCategory {
        name: "enterprise",
        domains: &[
            "office365.com", "office.com", "azure.com", "servicenow.com",
            "workday.com", "adp.com", "paychex.com", "zendesk.com",
            "freshworks.com", "hubspot.com", "mailchimp.com", "constantcontact.com",
            "sendgrid.com", "twilio.com", "vonage.com", "ringcentral.com",
            "goto.com", "webex.com", "docusign.com", "adobesign.com",
            "hellosign.com", "pandadoc.com", "basecamp.com", "smartsheet.com",
            "airtable.com", "clickup.com",
        ],
    },
    BrandCategory {
        name: "government",
        domains: &[
            "usa.gov", "irs.gov", "usps.com", "ssa.gov",
            "fbi.gov", "dhs.gov", "state.gov", "nasa.gov",
            "cdc.gov", "nih.gov", "fda.gov", "epa.gov",
            "sec.gov", "ftc.gov", "dol.gov", "va.gov",
            "medicare.gov", "socialsecurity.gov", "dmv.org", "gov.uk",
            "nhs.uk", "europa.eu", "un.org", "who.int",
            "worldbank.org", "imf.org", "nato.int",
        ],
    },
    BrandCategory {
        name: "education",
        domains: &[
            "harvard.edu", "mit.edu", "stanford.edu", "berkeley.edu",
            "yale.edu", "princeton.edu", "columbia.edu", "upenn.edu",
            "cornell.edu", "caltech.edu", "northwestern.edu", "duke.edu",
            "brown.edu", "dartmouth.edu", "vanderbilt.edu", "rice.edu",
            "notredame.edu", "georgetown.edu", "cmu.edu", "usc.edu",
            "ucla.edu", "ucsd.edu", "ucsb.edu", "ox.ac.uk",
            "cam.ac.uk", "imperial.ac.uk", "ucl.ac.uk", "coursera.org",
            "udemy.com", "khanacademy.org", "edx.org",
        ],
    },
    BrandCategory {
        name: "streaming",
        domains: &[
            "hulu.com", "disneyplus.com", "hbomax.com", "primevideo.com",
            "applemusic.com", "pandora.com", "tidal.com", "deezer.com",
            "amazonmusic.com", "youtubemusic.com", "peacocktv.com", "paramountplus.com",
            "showtime.com", "starz.com", "espn.com", "nfl.com",
            "nba.com", "mlb.com", "sling.com",
        ],
    },
    BrandCategory {
        name: "gaming",
        domains: &[
            "steam.com", "epicgames.com", "origin.com", "ubisoft.com",
            "ea.com", "activision.com", "blizzard.com", "riotgames.com",
            "playstation.com", "xbox.com", "nintendo.com", "roblox.com",
            "minecraft.net", "fortnite.com", "leagueoflegends.com", "valorant.com",
            "overwatch.com", "callofduty.com", "battlefield.com", "gog.com",
            "humblebundle.com", "itch.io",
        ],
    },
    BrandCategory {
        name: "storage",
        domains: &[
            "onedrive.com", "mega.nz", "sync.com", "pcloud.com",
            "icedrive.net", "tresorit.com", "nextcloud.com", "owncloud.com",
            "backblaze.com", "carbonite.com", "idrive.com", "crashplan.com",
            "digitalocean.com",
        ],
    },
    BrandCategory {
        name: "security",
        domains: &[
            "nordvpn.com", "expressvpn.com", "surfshark.com", "cyberghost.com",
            "privatevpn.com", "purevpn.com", "ipvanish.com", "tunnelbear.com",
            "protonvpn.com", "mullvad.net", "windscribe.com", "lastpass.com",
            "1password.com", "dashlane.com", "bitwarden.com", "keeper.com",
            "roboform.com", "nortonlifelock.com", "mcafee.com", "avg.com",
            "avast.com", "kaspersky.com", "bitdefender.com", "malwarebytes.com",
        ],
    },
];

/// Iterate every (category, brand domain, brand label) triple in index order
pub fn iter_brands() -> impl Iterator<Item = (&'static str, &'static str, &'static str)> {
    BRAND_INDEX.iter().flat_map(|category| {
        category.domains.iter().map(|domain| {
            let label = domain.split('.').next().unwrap_or(domain);
            (category.name, *domain, label)
        })
    })
}

/// Total number of indexed brand domains
pub fn brand_count() -> usize {
    BRAND_INDEX.iter().map(|c| c.domains.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_covers_twelve_categories() {
        assert_eq!(BRAND_INDEX.len(), 12);
    }

    #[test]
    fn index_holds_several_hundred_brands() {
        assert!(brand_count() > 300, "only {} brands", brand_count());
    }

    #[test]
    fn labels_strip_suffixes() {
        let (_, domain, label) = iter_brands()
            .find(|(_, d, _)| *d == "paypal.com")
            .unwrap();
        assert_eq!(domain, "paypal.com");
        assert_eq!(label, "paypal");
    }
}
