// EveTranslator - core/glossary.rs
//
// In-game jargon substitution applied before text reaches a provider.
// Core layer: term tables arrive as TOML strings; the app layer resolves and
// reads the bundled and user files.
//
// A `Glossary` is immutable once built. Changing the language pair builds a
// new one from scratch.

use crate::util::constants::DEFAULT_GLOSSARY_PAIR;
use crate::util::error::GlossaryError;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Flattened term -> replacement table from one source.
pub type TermTable = BTreeMap<String, String>;

/// Top-level key whose contents are metadata, not terms.
const META_KEY: &str = "meta";

/// Compiled-in zh -> en table for when no glossary file can be found.
const FALLBACK_ZH_EN: &[(&str, &str)] = &[
    // Ships
    ("穿梭机", "Shuttle"),
    ("蛋", "Pod"),
    ("截击", "Interceptor"),
    ("隐轰", "Bomber"),
    ("战术驱逐", "T3 Des"),
    ("佩刀", "Sabre"),
    ("巡洋", "Cruiser"),
    ("毒蜥", "Gila"),
    ("伊什塔", "Ishtar"),
    ("YST", "Ishtar"),
    ("海狂怒", "VNI"),
    ("奥萨斯", "Orthrus"),
    ("斯特拉修斯", "Stratios"),
    ("阿斯特罗", "Astero"),
    ("幼龙", "Drake"),
    ("金鹏", "Tengu"),
    ("洛基", "Loki"),
    ("军团", "Legion"),
    ("圣卒", "Proteus"),
    ("战列", "Battleship"),
    ("灾难", "Apocalypse"),
    ("地狱天使", "Abaddon"),
    ("末日沙场", "Armageddon"),
    ("万王宝座", "Megathron"),
    ("万王", "Megathron"),
    ("马克瑞", "Machariel"),
    ("小马", "Machariel"),
    ("噩梦", "Nightmare"),
    ("巴格斯", "Barghest"),
    ("响尾蛇", "Rattlesnake"),
    ("复仇者", "Vindicator"),
    ("乌鸦", "Raven"),
    ("鹏鲲", "Rokh"),
    ("台风", "Typhoon"),
    ("多米", "Dominix"),
    ("无畏", "Dreadnought"),
    ("小航", "Carrier"),
    ("大航", "Supercarrier"),
    ("泰坦", "Titan"),
    ("神使", "Avatar"),
    ("夜魔", "Nyx"),
    ("归魂", "Hel"),
    ("拉格", "Ragnarok"),
    ("勒维", "Leviathan"),
    ("俄洛巴", "Erebus"),
    ("大鲸鱼", "Rorqual"),
    ("小希", "Hic"),
    ("重拦", "HIC"),
    ("轻拦", "Dictor"),
    // Modules
    ("诱导", "Cyno"),
    ("隐秘诱导", "Covert Cyno"),
    ("泡泡", "Bubble"),
    ("隐身", "Cloak"),
    ("推子", "MWD"),
    ("加力", "AB"),
    ("反跳", "Scram"),
    ("长反", "Point"),
    ("网子", "Web"),
    ("毁电", "Neut"),
    ("吸电", "Nos"),
    ("炸弹", "Smartbomb"),
    ("末日", "Doomsday"),
    // Places
    ("吉他", "Jita"),
    ("底特", "Delve"),
    ("高安", "Highsec"),
    ("低安", "Lowsec"),
    ("00", "Nullsec"),
    ("虫洞", "Wormhole"),
    ("死亡", "DED/Deadspace"),
    // Trade
    ("收", "WTB"),
    ("出", "WTS"),
    // Activities and chat
    ("抓", "Tackled"),
    ("抓到了", "Tackled"),
    ("蹲", "Camping"),
    ("跳", "Jump"),
    ("过门", "Gate Jump"),
    ("刷怪", "Ratting"),
    ("挖矿", "Mining"),
    ("扫描", "Scanning"),
    ("收割", "Roaming"),
    ("舰队", "Fleet"),
    ("指挥", "FC"),
    ("本地", "Local"),
    ("蓝加", "+1"),
    ("救援", "Help/Cyno"),
    ("9命", "Help!"),
    ("打得不错", "Good Fight"),
    ("打得好", "Good Fight"),
    ("辛苦了", "GF / Good Job"),
    ("88", "Bye"),
    ("886", "Bye"),
    ("666", "Awesome"),
    ("牛逼", "Awesome/Badass"),
    ("nb", "Awesome"),
    ("GG", "Good Game"),
    ("武运昌隆", "Good Luck"),
    // Fleet commands
    ("对齐", "Align to"),
    ("跃迁", "Warp to"),
    ("集火", "Primary"),
    ("转火", "Switch Primary"),
    ("锁定", "Lock"),
    ("停船", "Stop Ship"),
    ("接近", "Approach"),
    ("环绕", "Orbit"),
    ("进站", "Dock"),
    ("出站", "Undock"),
    ("起跳", "Warping"),
    ("朝向", "Aligning"),
    ("不要过门", "Do not jump"),
    ("红", "Red/Stop"),
    ("绿", "Green/Go"),
    ("自由土", "Free burn"),
    ("土", "Free burn"),
    ("舰队长", "FC"),
    ("终点", "Destination"),
    ("亮诱导", "Lighting Cyno"),
    ("四散", "Starburst"),
    ("不要广播炸弹伤害", "No Bomb Broadcast"),
    ("跟走位", "Anchor up"),
    ("大鱼", "Rorqual"),
    ("火力", "DPS"),
    ("抓人", "Tackle"),
    ("保持距离", "Keep at Range"),
    ("跟", "Keep at Range/Follow"),
    ("跟上", "Keep at Range/Follow"),
    ("锚定", "Anchor up"),
    ("集合", "Anchor up/Regroup"),
    ("安塞克斯", "Ansiblex"),
    ("跳桥", "Jump Bridge"),
    ("走跳桥", "Take Jump Bridge"),
    ("走星门", "Take Gate"),
    ("超载", "Overheat"),
    ("开起推子", "Prop On"),
    ("关推子", "Prop Off"),
    ("开推", "Prop On"),
    ("关推", "Prop Off"),
    ("打泡泡", "Shoot Bubble"),
    ("拉泡泡", "Bubble Up"),
    ("下泡泡", "Bubble Up"),
    ("收泡泡", "Bubble Down"),
    ("修", "Repair/Logi"),
    ("后勤", "Logistics"),
    ("摇修", "Rep me"),
    ("给电", "Cap me"),
    ("注油", "Cap me"),
    ("开火", "Fire"),
    ("停火", "Cease Fire"),
    ("撒", "Scatter"),
    ("解散", "Scatter/Disband"),
];

// =============================================================================
// Table parsing
// =============================================================================

/// Parse a glossary TOML document into a flat term table.
///
/// The top-level `meta` table is skipped. Every other table is walked
/// recursively; group names are discarded and only string leaves kept.
pub fn parse_glossary_toml(content: &str, source_path: &Path) -> Result<TermTable, GlossaryError> {
    let root: toml::Table = toml::from_str(content).map_err(|e| GlossaryError::TomlParse {
        path: source_path.to_path_buf(),
        source: e,
    })?;

    let mut terms = TermTable::new();
    for (key, value) in root {
        if key == META_KEY {
            continue;
        }
        flatten_into(key, value, &mut terms);
    }
    Ok(terms)
}

fn flatten_into(key: String, value: toml::Value, terms: &mut TermTable) {
    match value {
        toml::Value::String(replacement) => {
            terms.insert(key, replacement);
        }
        toml::Value::Table(table) => {
            for (k, v) in table {
                flatten_into(k, v, terms);
            }
        }
        // Numbers, arrays and dates are not terms.
        _ => {}
    }
}

/// The compiled-in table as an owned `TermTable`.
pub fn fallback_terms() -> TermTable {
    FALLBACK_ZH_EN
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

// =============================================================================
// Glossary
// =============================================================================

fn alphanumeric_term() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("term pattern is a valid regex"))
}

#[derive(Debug, Clone)]
enum Matcher {
    /// ASCII alphanumeric term, matched on word boundaries.
    Word(Regex),
    /// Anything else (ideographs, symbols), matched as a plain substring.
    Literal,
}

#[derive(Debug, Clone)]
struct TermRule {
    term: String,
    replacement: String,
    matcher: Matcher,
}

/// Piece of text during substitution: either still open to matching or
/// already produced by a term.
enum Piece<'a> {
    Open(String),
    Replaced(&'a str),
}

/// Immutable compiled term table for one language pair.
#[derive(Debug, Clone)]
pub struct Glossary {
    source_lang: String,
    target_lang: String,
    rules: Vec<TermRule>,
}

impl Glossary {
    /// A glossary with no terms; `replace_terms` only normalises whitespace.
    pub fn empty(source_lang: &str, target_lang: &str) -> Self {
        Self::from_terms(source_lang, target_lang, TermTable::new())
    }

    /// Compile a glossary from an already merged table.
    pub fn from_terms(source_lang: &str, target_lang: &str, terms: TermTable) -> Self {
        let mut rules: Vec<TermRule> = terms
            .into_iter()
            .filter(|(term, _)| !term.trim().is_empty())
            .map(|(term, replacement)| {
                let matcher = if alphanumeric_term().is_match(&term) {
                    match Regex::new(&format!(r"\b{}\b", regex::escape(&term))) {
                        Ok(re) => Matcher::Word(re),
                        Err(_) => Matcher::Literal,
                    }
                } else {
                    Matcher::Literal
                };
                TermRule {
                    term,
                    replacement,
                    matcher,
                }
            })
            .collect();

        // Longest first; the BTreeMap order breaks ties deterministically.
        rules.sort_by_key(|r| std::cmp::Reverse(r.term.chars().count()));

        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            rules,
        }
    }

    /// Merge `layers` in increasing priority (later wins) and compile.
    ///
    /// When nothing resolves and the pair is the default pair, the
    /// compiled-in table is used instead.
    pub fn from_layers(source_lang: &str, target_lang: &str, layers: Vec<TermTable>) -> Self {
        let mut merged = TermTable::new();
        for layer in layers {
            merged.extend(layer);
        }

        if merged.is_empty() && (source_lang, target_lang) == DEFAULT_GLOSSARY_PAIR {
            tracing::warn!(
                source = source_lang,
                target = target_lang,
                "No glossary files found; using compiled-in table"
            );
            merged = fallback_terms();
        }

        Self::from_terms(source_lang, target_lang, merged)
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replacement for `term`, if the glossary has one.
    pub fn get(&self, term: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.term == term)
            .map(|r| r.replacement.as_str())
    }

    /// Replace every known term in `text`.
    ///
    /// Terms are applied longest first. Text produced by one replacement is
    /// never matched by a later term. Each replacement is padded with spaces
    /// and the result is whitespace-normalised.
    pub fn replace_terms(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut pieces = vec![Piece::Open(text.to_string())];
        for rule in &self.rules {
            pieces = pieces
                .into_iter()
                .flat_map(|piece| match piece {
                    Piece::Open(s) => split_on_term(s, rule),
                    done @ Piece::Replaced(_) => vec![done],
                })
                .collect();
        }

        let mut out = String::with_capacity(text.len() * 2);
        for piece in &pieces {
            match piece {
                Piece::Open(s) => out.push_str(s),
                Piece::Replaced(r) => {
                    out.push(' ');
                    out.push_str(r);
                    out.push(' ');
                }
            }
        }
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Split one open piece around every match of `rule`.
fn split_on_term(s: String, rule: &TermRule) -> Vec<Piece<'_>> {
    let ranges: Vec<(usize, usize)> = match &rule.matcher {
        Matcher::Word(re) => re.find_iter(&s).map(|m| (m.start(), m.end())).collect(),
        Matcher::Literal => s
            .match_indices(rule.term.as_str())
            .map(|(i, m)| (i, i + m.len()))
            .collect(),
    };
    if ranges.is_empty() {
        return vec![Piece::Open(s)];
    }

    let mut out = Vec::with_capacity(ranges.len() * 2 + 1);
    let mut last = 0;
    for (start, end) in ranges {
        if start > last {
            out.push(Piece::Open(s[last..start].to_string()));
        }
        out.push(Piece::Replaced(rule.replacement.as_str()));
        last = end;
    }
    if last < s.len() {
        out.push(Piece::Open(s[last..].to_string()));
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
