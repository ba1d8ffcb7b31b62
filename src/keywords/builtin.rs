// src/keywords/builtin.rs
// Built-in synonym table for the process-engineering / carbon-capture
// domain. Overridable at runtime through PAPERSCOUT_KEYWORDS_FILE.

/// (canonical keyword, synonyms), synonym order preserved for reason display.
pub(crate) const BUILTIN_SYNONYMS: &[(&str, &[&str])] = &[
    // Carbon capture
    (
        "co2 capture",
        &["carbon dioxide capture", "carbon capture", "co₂ capture", "ccs"],
    ),
    (
        "carbon capture and storage",
        &["ccs", "carbon capture storage", "carbon sequestration"],
    ),
    (
        "direct air capture",
        &["dac", "air capture", "atmospheric co2 removal"],
    ),
    (
        "calcium looping",
        &["cal", "calcium carbonate looping", "caco3 looping"],
    ),
    (
        "carbon neutrality",
        &["carbon neutral", "net zero", "carbon-neutral", "decarbonization", "decarbonisation"],
    ),
    // Process engineering
    (
        "techno-economic analysis",
        &["tea", "economic analysis", "technoeconomic", "cost analysis", "economic assessment"],
    ),
    (
        "process modeling",
        &["process modelling", "process simulation", "mathematical modeling", "process model"],
    ),
    (
        "process simulation",
        &["simulation", "process modelling", "dynamic simulation"],
    ),
    (
        "process optimization",
        &["optimization", "optimisation", "process improvement"],
    ),
    (
        "system integration",
        &["integration", "system design", "integrated system"],
    ),
    // Energy
    (
        "renewable energy",
        &["clean energy", "sustainable energy", "green energy", "renewables"],
    ),
    (
        "energy system optimization",
        &["energy optimization", "energy system", "optimal energy"],
    ),
    (
        "power plant",
        &["power station", "power generation", "electricity generation"],
    ),
    // AI / data
    (
        "ai-based optimization",
        &["ai optimization", "artificial intelligence", "machine learning optimization", "ml optimization"],
    ),
    (
        "data-driven modeling",
        &["data-driven model", "data-based modeling", "machine learning model"],
    ),
    (
        "ai based modeling",
        &["ai modeling", "ai model", "machine learning modeling", "ml model"],
    ),
    // Fuels
    (
        "hydrogen",
        &["h2", "hydrogen production", "hydrogen energy", "green hydrogen"],
    ),
    (
        "ammonia",
        &["nh3", "ammonia production", "green ammonia", "ammonia synthesis"],
    ),
    // Software / tools
    ("aspen", &["aspen plus", "aspen hysys", "aspentech"]),
    // Pollutants
    ("co2", &["carbon dioxide", "co₂", "carbon-dioxide"]),
    (
        "nox",
        &["nitrogen oxide", "nitrogen oxides", "no2", "no", "nitric oxide"],
    ),
    // Analysis methods
    (
        "lca",
        &["life cycle assessment", "lifecycle assessment", "life-cycle analysis", "environmental impact assessment"],
    ),
];

/// Papers mentioning any of these terms are dropped by the exclusion
/// post-filter: catalyst-family research is out of scope for the target
/// process-engineering profile.
pub(crate) const BUILTIN_EXCLUSIONS: &[&str] = &[
    // Catalysis terms
    "catalyst",
    "catalysts",
    "catalysis",
    "catalytic",
    "catalyzed",
    "photocatalyst",
    "electrocatalyst",
    "biocatalyst",
    "catalytic conversion",
    "catalytic reaction",
    "catalytic activity",
    "catalytic performance",
    "catalyst support",
    // Precious-metal catalysts
    "platinum",
    "pt catalyst",
    "palladium",
    "pd catalyst",
    "rhodium",
    "rh catalyst",
    "ruthenium",
    "ru catalyst",
    "iridium",
    "ir catalyst",
    "gold catalyst",
    "au catalyst",
    "silver catalyst",
    "ag catalyst",
    // Common metal catalysts
    "nickel catalyst",
    "ni catalyst",
    "copper catalyst",
    "cu catalyst",
    "iron catalyst",
    "fe catalyst",
    "cobalt catalyst",
    "co catalyst",
    "zinc catalyst",
    "zn catalyst",
    "molybdenum catalyst",
    "mo catalyst",
    // Metal-specific materials research
    "metal nanoparticle",
    "metal oxide catalyst",
    "bimetallic catalyst",
    "metal organic framework catalyst",
    "mof catalyst",
    "zeolite catalyst",
    "heterogeneous catalyst",
];
