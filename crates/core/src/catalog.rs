//! The fixed project catalog the bot rotates through.
//!
//! A [`Catalog`] is an ordered, non-empty list of [`ContentUnit`]s. Each unit's
//! `index` always equals its position, which is what the persisted cursor
//! stores. The built-in catalog holds the 25 blockchain projects the bot was
//! launched with; tests build small catalogs with [`Catalog::new`].

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Content units
// ---------------------------------------------------------------------------

/// One catalog entry supplying generation input. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentUnit {
    /// Position in the catalog (`0..catalog.len()`).
    pub index: usize,
    /// URL-safe identifier derived from the name, e.g. `"huma-finance"`.
    pub slug: String,
    pub name: String,
    pub website: String,
    /// Social handle including the leading `@`.
    pub handle: String,
    pub description: String,
    pub category: String,
}

impl ContentUnit {
    /// Build a unit. The index is assigned when the unit is placed in a
    /// [`Catalog`].
    pub fn new(
        name: impl Into<String>,
        website: impl Into<String>,
        handle: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            index: 0,
            slug: slugify(&name),
            name,
            website: website.into(),
            handle: handle.into(),
            description: description.into(),
            category: category.into(),
        }
    }
}

/// Lowercase the name and collapse every run of non-alphanumerics into `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Ordered, non-empty list of content units.
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    units: Vec<ContentUnit>,
}

impl Catalog {
    /// Build a catalog from units, reassigning each unit's index to its
    /// position.
    ///
    /// Fails if `units` is empty or two units share a slug.
    pub fn new(units: Vec<ContentUnit>) -> Result<Self, CoreError> {
        if units.is_empty() {
            return Err(CoreError::Validation(
                "catalog must contain at least one unit".to_string(),
            ));
        }

        let mut units = units;
        for (position, unit) in units.iter_mut().enumerate() {
            unit.index = position;
        }

        for (i, unit) in units.iter().enumerate() {
            if units[..i].iter().any(|other| other.slug == unit.slug) {
                return Err(CoreError::Validation(format!(
                    "duplicate catalog slug '{}'",
                    unit.slug
                )));
            }
        }

        Ok(Self { units })
    }

    /// The 25 projects the bot ships with.
    pub fn builtin() -> Self {
        let units = BUILTIN_PROJECTS
            .iter()
            .map(|(name, website, handle, description, category)| {
                ContentUnit::new(*name, *website, *handle, *description, *category)
            })
            .collect();
        Self::new(units).expect("built-in catalog is non-empty with unique slugs")
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Never true for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ContentUnit> {
        self.units.get(index)
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<&ContentUnit> {
        self.units.iter().find(|u| u.slug == slug)
    }

    /// Like [`find_by_slug`](Self::find_by_slug), with a missing slug as
    /// [`CoreError::NotFound`].
    pub fn require_slug(&self, slug: &str) -> Result<&ContentUnit, CoreError> {
        self.find_by_slug(slug).ok_or_else(|| CoreError::NotFound {
            entity: "Project",
            key: slug.to_string(),
        })
    }

    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    /// Distinct categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for unit in &self.units {
            if !seen.contains(&unit.category.as_str()) {
                seen.push(&unit.category);
            }
        }
        seen
    }

    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ContentUnit> {
        self.units.iter().filter(move |u| u.category == category)
    }
}

// ---------------------------------------------------------------------------
// Category profiles
// ---------------------------------------------------------------------------

/// Extra prompt context for a project category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryProfile {
    pub category: &'static str,
    pub focus_areas: &'static [&'static str],
    pub key_metrics: &'static [&'static str],
}

const CATEGORY_PROFILES: &[CategoryProfile] = &[
    CategoryProfile {
        category: "DeFi",
        focus_areas: &["trading", "liquidity", "yield farming", "lending", "derivatives"],
        key_metrics: &["TVL", "volume", "fees generated", "user growth"],
    },
    CategoryProfile {
        category: "Layer 1",
        focus_areas: &["consensus", "scalability", "decentralization", "security"],
        key_metrics: &["TPS", "validator count", "network effects", "developer activity"],
    },
    CategoryProfile {
        category: "Layer 2",
        focus_areas: &["scaling", "fees", "security", "interoperability"],
        key_metrics: &["transaction cost", "throughput", "bridge security", "adoption"],
    },
    CategoryProfile {
        category: "Infrastructure",
        focus_areas: &["developer tools", "interoperability", "performance", "composability"],
        key_metrics: &["developer adoption", "integration count", "performance benchmarks"],
    },
    CategoryProfile {
        category: "Gaming",
        focus_areas: &["user experience", "economics", "NFTs", "metaverse"],
        key_metrics: &["player count", "retention", "in-game economy", "asset trading"],
    },
    CategoryProfile {
        category: "Social",
        focus_areas: &["user experience", "content creation", "monetization", "community"],
        key_metrics: &["user growth", "engagement", "content volume", "creator economy"],
    },
    CategoryProfile {
        category: "Identity",
        focus_areas: &["privacy", "verification", "reputation", "compliance"],
        key_metrics: &["verification rate", "privacy guarantees", "adoption by institutions"],
    },
    CategoryProfile {
        category: "AI",
        focus_areas: &["automation", "intelligence", "personalization", "efficiency"],
        key_metrics: &["AI accuracy", "user satisfaction", "automation level", "cost reduction"],
    },
];

/// Look up the prompt profile for a category. Categories without a profile
/// (e.g. `"RWA"`) return `None` and the prompt omits the section.
pub fn category_profile(category: &str) -> Option<&'static CategoryProfile> {
    CATEGORY_PROFILES.iter().find(|p| p.category == category)
}

// ---------------------------------------------------------------------------
// Built-in data
// ---------------------------------------------------------------------------

/// `(name, website, handle, description, category)`
const BUILTIN_PROJECTS: [(&str, &str, &str, &str, &str); 25] = [
    ("Infinex", "infinex.xyz", "@infinex", "DeFi trading platform focused on perpetual futures", "DeFi"),
    ("Espresso", "espressosys.com", "@EspressoSys", "Blockchain infrastructure for decentralized sequencing", "Infrastructure"),
    ("Boop", "boop.fun", "@boopdotfun", "Social platform for blockchain interactions", "Social"),
    ("Somnia", "somnia.network", "@Somnia_Network", "High-performance blockchain for gaming and virtual worlds", "Gaming"),
    ("Openledger", "openledger.xyz", "@OpenledgerHQ", "Decentralized ledger infrastructure", "Infrastructure"),
    ("Sei", "sei.io", "@SeiNetwork", "Purpose-built Layer 1 blockchain for trading", "Layer 1"),
    ("Sophon", "sophon.xyz", "@sophon", "Entertainment-focused blockchain ecosystem", "Entertainment"),
    ("Soon", "soon.app", "@soon_svm", "Solana Virtual Machine implementation", "Infrastructure"),
    ("Huma Finance", "humafinance.com", "@humafinance", "Real-world asset tokenization platform", "RWA"),
    ("Sunrise", "sunriselayer.com", "@SunriseLayer", "Data availability layer for blockchain scalability", "Infrastructure"),
    ("Skate", "skatechain.com", "@skate_chain", "Universal app chain for multi-chain applications", "Infrastructure"),
    ("dYdX", "dydx.exchange", "@dYdX", "Decentralized derivatives exchange", "DeFi"),
    ("Maplestory Universe", "maplestoryu.com", "@MaplestoryU", "Blockchain gaming metaverse", "Gaming"),
    ("Camp Network", "campnetwork.xyz", "@campnetworkxyz", "Modular blockchain for consumer applications", "Infrastructure"),
    ("Arbitrum", "arbitrum.org", "@arbitrum", "Ethereum Layer 2 scaling solution", "Layer 2"),
    ("Polkadot", "polkadot.network", "@Polkadot", "Multi-chain blockchain protocol", "Layer 1"),
    ("Lombard", "lombard.finance", "@Lombard_Finance", "Bitcoin liquid staking protocol", "DeFi"),
    ("Fomo", "tryfomo.com", "@tryfomo", "Social trading platform", "Social"),
    ("Humanity Protocol", "humanityprot.org", "@Humanityprot", "Human identity verification protocol", "Identity"),
    ("Mantle", "mantlenetwork.io", "@Mantle_Official", "Ethereum Layer 2 with modular architecture", "Layer 2"),
    ("Newton", "magicnewton.com", "@MagicNewton", "AI-powered blockchain analytics", "Analytics"),
    ("Novastro", "novastro.xyz", "@Novastro_xyz", "Decentralized space exploration platform", "Utility"),
    ("Satlayer", "satlayer.com", "@satlayer", "Bitcoin restaking infrastructure", "Infrastructure"),
    ("Soul", "0xsoulprotocol.com", "@0xSoulProtocol", "Decentralized identity and reputation system", "Identity"),
    ("Virtuals", "virtuals.io", "@virtuals_io", "AI agents marketplace for virtual interactions", "AI"),
];
