//! Display glyphs for categories.
//!
//! Lookup order:
//! 1. exact match of the normalized category against [`CATEGORY_GLYPHS`];
//! 2. first rule of [`GLYPH_RULES`] with a keyword contained in
//!    `"<category> <description>"` (lower-cased);
//! 3. [`DEFAULT_GLYPH`].

/// Category used when none was given.
pub const UNCATEGORIZED: &str = "Uncategorized";

pub const DEFAULT_GLYPH: &str = "💸";

pub const CATEGORY_GLYPHS: &[(&str, &str)] = &[
    ("groceries", "🛒"),
    ("shopping", "👚"),
    ("rent", "🏠"),
    ("housing", "🏠"),
    ("transport", "🚕"),
    ("transportation", "🚕"),
    ("bills", "🧾"),
    ("utilities", "💡"),
    ("health", "🏥"),
    ("medical", "🏥"),
    ("entertainment", "🎬"),
    ("dining", "🍽️"),
    ("food", "🥗"),
    ("restaurant", "🍽️"),
    ("salary", "💰"),
    ("income", "💰"),
    ("payroll", "💰"),
    ("transfer", "🔁"),
    ("savings", "🏦"),
    ("investment", "📈"),
    ("education", "🎓"),
    ("travel", "✈️"),
    ("personal", "👤"),
    ("gift", "🎁"),
    ("charity", "🤝"),
    ("insurance", "🛡️"),
    ("subscriptions", "🔄"),
    ("tech", "💻"),
];

/// Keyword rules, highest priority first.
pub const GLYPH_RULES: &[(&[&str], &str)] = &[
    // Transport
    (&["uber", "lyft", "bolt", "taxi", "cab"], "🚕"),
    (&["bus", "train", "metro", "subway", "tram", "rail"], "🚍"),
    (&["fuel", "gas", "petrol", "shell", "bp", "circle k"], "⛽"),
    (&["parking", "garage"], "🅿️"),
    (&["airline", "flight", "ticket", "ryanair", "wizz", "lufthansa"], "✈️"),
    // Food & drink
    (
        &[
            "market", "supermarket", "lidl", "aldi", "tesco", "auchan", "carrefour", "walmart",
            "grocery",
        ],
        "🛒",
    ),
    (
        &[
            "restaurant", "cafe", "coffee", "starbucks", "costa", "bistro", "burger", "pizza",
            "sushi", "mcdonalds", "kfc",
        ],
        "🍽️",
    ),
    (&["bar", "pub", "beer", "wine", "liquor"], "🍺"),
    // Shopping
    (&["amazon", "ebay", "aliexpress", "temu"], "📦"),
    (&["clothing", "zara", "h&m", "uniqlo", "nike", "adidas", "fashion"], "👚"),
    (&["tech", "apple", "samsung", "microsoft", "google", "electronics"], "💻"),
    (&["pharmacy", "drugstore", "medicine", "doctor", "clinic", "dentist"], "🏥"),
    // Entertainment / subscriptions
    (
        &["netflix", "spotify", "hbo", "disney", "prime video", "youtube", "subscription"],
        "📺",
    ),
    (&["cinema", "movie", "theater", "theatre", "film"], "🎬"),
    (&["game", "steam", "playstation", "xbox", "nintendo"], "🎮"),
    // Housing / utilities
    (&["rent", "landlord", "apartment", "mortgage"], "🏠"),
    (&["electric", "power", "water", "gas", "bill", "utility"], "💡"),
    (&["internet", "wifi", "broadband", "telecom", "phone", "mobile"], "📱"),
    // Financial
    (&["salary", "payroll", "wage", "income", "earning"], "💰"),
    (&["tax", "irs", "revenue"], "🏛️"),
    // Work
    (&["upwork", "fiverr", "freelance"], "💼"),
    // Banking & wallets
    (
        &[
            "revolut", "monzo", "n26", "starling", "nubank", "chase", "hsbc", "barclays",
            "santander", "bank",
        ],
        "🏦",
    ),
    (&["paypal", "wise", "venmo", "cashapp", "klarna"], "💸"),
    (&["cash", "pocket", "hand"], "💵"),
    (&["savings", "reserve", "vault", "emergency"], "🐖"),
    (&["credit", "visa", "mastercard", "amex", "platinum", "gold"], "💳"),
    (&["crypto", "bitcoin", "btc", "eth", "binance", "coinbase", "kraken"], "🪙"),
];

/// Returns the display glyph for a category and free-text description.
///
/// Never fails and never returns an empty string.
#[must_use]
pub fn glyph_for(category: Option<&str>, description: Option<&str>) -> &'static str {
    let category = category.unwrap_or("").trim().to_lowercase();

    if !category.is_empty()
        && let Some((_, glyph)) = CATEGORY_GLYPHS.iter().find(|(key, _)| *key == category)
    {
        return *glyph;
    }

    let haystack = format!("{category} {}", description.unwrap_or("")).to_lowercase();
    GLYPH_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| haystack.contains(keyword)))
        .map_or(DEFAULT_GLYPH, |(_, glyph)| *glyph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_category_beats_keywords() {
        assert_eq!(glyph_for(Some("Rent"), Some("Amazon purchase")), "🏠");
        assert_eq!(glyph_for(Some("  GROCERIES "), None), "🛒");
    }

    #[test]
    fn keywords_match_category_and_description() {
        assert_eq!(glyph_for(None, Some("Uber ride home")), "🚕");
        assert_eq!(glyph_for(Some("Amazon"), None), "📦");
        assert_eq!(glyph_for(Some("misc"), Some("Netflix monthly")), "📺");
    }

    #[test]
    fn earlier_rules_win_on_collision() {
        // "gas" appears both in the fuel rule and in the utilities rule.
        assert_eq!(glyph_for(None, Some("gas bill")), "⛽");
    }

    #[test]
    fn unknown_text_falls_back_to_default() {
        assert_eq!(glyph_for(None, Some("unrecognized text xyz")), DEFAULT_GLYPH);
        assert_eq!(glyph_for(None, None), DEFAULT_GLYPH);
        assert_eq!(glyph_for(Some("   "), Some("")), DEFAULT_GLYPH);
    }
}
