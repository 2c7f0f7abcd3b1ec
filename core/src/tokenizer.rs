use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref MARKUP_RE: Regex =
        Regex::new(r"(?s)<!--.*?-->|<script\b.*?</script>|<style\b.*?</style>|<[^>]*>|&#?\w+;?")
            .expect("valid regex");
    static ref CSS_RE: Regex = Regex::new(r"[^\s{};]+(?:\s*,\s*[^\s{};]+)*\s*\{[^}]*\}").expect("valid regex");
    static ref TOKEN_RE: Regex = Regex::new(concat!(
        r"(?P<url>(?:https?://|www\.)[^\s<>/]+)",
        r"|(?P<email>[\w.+\-]+@[\w\-]+(?:\.[\w\-]+)+)",
        r"|(?P<number>[1-9][\d,\-]*(?:\.\d+)?)",
        r"|(?P<word>\p{L}[\p{L}\p{N}_'’\-]*(?:\.\p{L}[\p{L}\p{N}_'’\-]*)*)",
    ))
    .expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Splits text into normalized lowercase terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tokenizer {
    pub stem: bool,
}

impl Tokenizer {
    pub fn new(stem: bool) -> Self { Self { stem } }

    pub fn tokenize(&self, text: &str) -> Tokens {
        Tokens { text: normalize(text), pos: 0, stem: self.stem }
    }
}

/// Tokenize without stemming.
pub fn tokenize(text: &str) -> Tokens {
    Tokenizer::default().tokenize(text)
}

/// NFKC, lowercase, and markup replaced by spaces.
fn normalize(text: &str) -> String {
    let lowered = text.nfkc().collect::<String>().to_lowercase();
    let stripped = MARKUP_RE.replace_all(&lowered, " ");
    CSS_RE.replace_all(&stripped, " ").into_owned()
}

/// Lazy token stream over one normalized text.
pub struct Tokens {
    text: String,
    pos: usize,
    stem: bool,
}

impl Iterator for Tokens {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some(caps) = TOKEN_RE.captures_at(&self.text, self.pos) {
            let whole = caps.get(0)?;
            self.pos = whole.end();
            let token = if let Some(m) = caps.name("url") {
                m.as_str().replace("https://", "").replace("http://", "").replace("www", "").replace('.', "")
            } else if let Some(m) = caps.name("email") {
                m.as_str().split('@').next().unwrap_or_default().to_string()
            } else if let Some(m) = caps.name("number") {
                let int_part = m.as_str().split('.').next().unwrap_or_default();
                int_part.chars().filter(|c| c.is_ascii_digit()).collect()
            } else {
                let word: String = whole.as_str().chars().filter(|c| !matches!(c, '\'' | '’' | '-' | '.')).collect();
                if self.stem { STEMMER.stem(&word).into_owned() } else { word }
            };
            if !token.is_empty() {
                return Some(token);
            }
        }
        self.pos = self.text.len();
        None
    }
}
