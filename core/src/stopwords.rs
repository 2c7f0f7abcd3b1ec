use crate::error::{Error, Result};
use crate::hashtable::HashTable;
use crate::tokenizer::Tokenizer;
use std::path::Path;

const ENGLISH: &[&str] = &[
    "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
    "be","because","been","before","being","below","between","both","but","by",
    "can","can't","cannot","could","couldn't",
    "did","didn't","do","does","doesn't","doing","don't","down","during",
    "each","few","for","from","further",
    "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
    "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
    "let's","me","more","most","mustn't","my","myself",
    "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
    "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
    "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
    "under","until","up","very",
    "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
    "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
];

/// Terms excluded from indexing.
pub struct StopwordSet {
    table: HashTable<u32>,
}

impl StopwordSet {
    pub fn empty(table_size: usize) -> Self {
        Self { table: HashTable::new(table_size) }
    }

    /// Every token longer than one character in `text`, normalized with `tokenizer`.
    pub fn from_text(text: &str, table_size: usize, tokenizer: &Tokenizer) -> Result<Self> {
        let mut set = Self::empty(table_size);
        for token in tokenizer.tokenize(text) {
            if token.chars().count() > 1 {
                set.table.insert(&token, 1)?;
            }
        }
        Ok(set)
    }

    pub fn from_file(path: &Path, table_size: usize, tokenizer: &Tokenizer) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InvalidPath(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let set = Self::from_text(&text, table_size, tokenizer)?;
        tracing::debug!(path = %path.display(), words = set.len(), "loaded stopwords");
        Ok(set)
    }

    pub fn english(table_size: usize, tokenizer: &Tokenizer) -> Result<Self> {
        Self::from_text(&ENGLISH.join(" "), table_size, tokenizer)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.table.contains(token)
    }

    pub fn len(&self) -> usize {
        self.table.unique_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
