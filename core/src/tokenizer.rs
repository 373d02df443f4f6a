use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    // A word run may carry inner separators ("50,000", "e-mail", "don't"); any other
    // non-space character stands alone.
    static ref RE: Regex = Regex::new(r"\w+(?:[.,'\-]\w+)*|[^\w\s]").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn","couldn't",
            "d","did","didn","didn't","do","does","doesn","doesn't","doing","don","don't","down","during",
            "each","few","for","from","further",
            "had","hadn","hadn't","has","hasn","hasn't","have","haven","haven't","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","isn't","it","it's","its","itself",
            "just","ll","m","ma","me","mightn","mightn't","more","most","mustn","mustn't","my","myself",
            "needn","needn't","no","nor","not","now",
            "o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","shan't","she","she's","should","should've","shouldn","shouldn't","so","some","such",
            "t","than","that","that'll","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","wasn't","we","were","weren","weren't","what","when","where","which","while","who","whom","why","will","with","won","won't","wouldn","wouldn't",
            "y","you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Exact, case-sensitive membership in the English stopword list.
pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Split a token into its ASCII-alphanumeric fragments; every other character is a
/// boundary, so fragments may be empty.
fn ascii_fragments(token: &str) -> impl Iterator<Item = &str> {
    token.split(|c: char| !c.is_ascii_alphanumeric())
}

/// Normalize text into an ordered sequence of index terms.
///
/// NFKC-normalizes the text, tokenizes it, drops stopwords, splits every remaining
/// token on non-ASCII-alphanumeric characters, stems each fragment and drops empty
/// results. Case is preserved and the output keeps duplicates, which drive term
/// frequency.
pub fn normalize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>();
    let mut terms = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        if is_stopword(token) { continue; }
        for fragment in ascii_fragments(token) {
            if fragment.is_empty() { continue; }
            let stem = STEMMER.stem(fragment);
            if !stem.is_empty() {
                terms.push(stem.into_owned());
            }
        }
    }
    terms
}
