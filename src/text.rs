//! Keyword extraction and sentiment bucketing over entry content.
//!
//! Content is split by morphological analysis against IPADIC. Only nouns,
//! verbs and adjectives are kept, each by its dictionary form, so
//! 楽しかった counts as 楽しい and 食べた as 食べる.

use crate::models::Entry;
use lindera::dictionary::{DictionaryKind, load_dictionary_from_kind};
use lindera::mode::Mode;
use lindera::segmenter::Segmenter;
use lindera::tokenizer::Tokenizer;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, warn};

pub const STOP_WORDS: &[&str] = &[
    "てる", "いる", "なる", "れる", "する", "ある", "こと", "これ", "さん", "して", "くれる",
    "やる", "くる", "しまう", "いく", "ない", "のだ", "よう", "あり", "ため", "ところ", "ます",
    "です", "から", "まで", "たり", "けど", "ので", "たい", "もの", "それ", "その", "今日", "日",
    "は", "が", "の", "に", "を", "へ", "と", "も", "で", "や", "し", "ながら", "なら", "けれど",
    "だって", "なのに", "だけど", "だ", "だが", "そして", "しかし", "だから", "また", "につい",
    "すると", "なるほど", "ほんの", "いい", "られる", "the", "a", "an", "and", "or", "but",
    "to", "of", "in", "on", "at", "for", "with", "is", "was", "were", "are", "be", "been", "it",
    "i", "me", "my", "we", "you", "he", "she", "they", "this", "that", "so", "very", "today",
    "day",
];

const CONTENT_POS: &[&str] = &["名詞", "動詞", "形容詞"];

// IPADIC feature columns.
const POS: usize = 0;
const POS_DETAIL: usize = 1;
const BASE_FORM: usize = 6;
const UNKNOWN: &str = "UNK";

static TOKENIZER: Lazy<Option<Tokenizer>> = Lazy::new(|| {
    match load_dictionary_from_kind(DictionaryKind::IPADIC) {
        Ok(dictionary) => Some(Tokenizer::new(Segmenter::new(Mode::Normal, dictionary, None))),
        Err(err) => {
            error!(error = %err, "failed to load the IPADIC dictionary");
            None
        }
    }
});

/// Dictionary forms of the nouns, verbs and adjectives in `text`, in order.
///
/// Numerals are skipped; stop words are kept.
pub fn content_words(text: &str) -> Vec<String> {
    let Some(tokenizer) = TOKENIZER.as_ref() else {
        return Vec::new();
    };
    let mut tokens = match tokenizer.tokenize(text) {
        Ok(tokens) => tokens,
        Err(err) => {
            warn!(error = %err, "morphological analysis failed");
            return Vec::new();
        }
    };

    let mut words = Vec::new();
    for token in tokens.iter_mut() {
        let surface = token.text.to_string();
        let details: Vec<String> = token.details().iter().map(|d| d.to_string()).collect();
        let pos = details.get(POS).map(String::as_str).unwrap_or_default();
        // Out-of-dictionary tokens carry no features; keep the ones that read as words.
        let unknown_word = pos == UNKNOWN && surface.chars().any(char::is_alphabetic);
        let numeral = details.get(POS_DETAIL).is_some_and(|d| d == "数");
        if !(CONTENT_POS.contains(&pos) || unknown_word) || numeral {
            continue;
        }
        let base = match details.get(BASE_FORM) {
            Some(base) if base != "*" => base.clone(),
            _ => surface,
        };
        let word = base.trim().to_lowercase();
        if !word.is_empty() && !word.chars().all(|c| c.is_ascii_digit()) {
            words.push(word);
        }
    }
    words
}

/// Content words of `text` with stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    content_words(text)
        .into_iter()
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub word: String,
    pub count: usize,
}

/// Top `limit` stems across all entries; equal counts keep first-seen order.
pub fn keyword_frequency(entries: &[Entry], limit: usize) -> Vec<KeywordCount> {
    let mut order: Vec<KeywordCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        for word in tokenize(&entry.content) {
            match index.get(&word) {
                Some(&i) => order[i].count += 1,
                None => {
                    index.insert(word.clone(), order.len());
                    order.push(KeywordCount { word, count: 1 });
                }
            }
        }
    }

    // Stable sort keeps insertion order among ties.
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order.truncate(limit);
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    /// Dictionary forms that put an entry in this bucket.
    pub fn lexicon(self) -> &'static [&'static str] {
        match self {
            Sentiment::Positive => &[
                "嬉しい", "楽しい", "幸せ", "わくわく", "最高", "喜び", "素晴らしい", "良い",
                "成功", "達成",
            ],
            Sentiment::Negative => &[
                "悲しい", "辛い", "苦しい", "不安", "心配", "失敗", "残念", "怖い", "疲れる",
                "しんどい",
            ],
            Sentiment::Neutral => &[
                "考える", "思う", "感じる", "予定", "明日", "今日", "昨日", "たぶん",
                "かもしれない",
            ],
        }
    }

    /// Whether any of `words` (see [`content_words`]) is in the lexicon.
    pub fn matches(self, words: &[String]) -> bool {
        words
            .iter()
            .any(|word| self.lexicon().contains(&word.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentMean {
    pub sentiment: Sentiment,
    pub mean_rating: Option<f64>,
    pub count: usize,
}

/// Mean rating of the entries whose content hits each lexicon.
pub fn sentiment_means(entries: &[Entry]) -> Vec<SentimentMean> {
    let analysed: Vec<(Vec<String>, f64)> = entries
        .iter()
        .map(|entry| (content_words(&entry.content), f64::from(entry.rating)))
        .collect();

    Sentiment::ALL
        .iter()
        .map(|&sentiment| {
            let ratings: Vec<f64> = analysed
                .iter()
                .filter(|(words, _)| sentiment.matches(words))
                .map(|(_, rating)| *rating)
                .collect();
            SentimentMean {
                sentiment,
                mean_rating: crate::stats::mean(&ratings),
                count: ratings.len(),
            }
        })
        .collect()
}

/// Bucket with the highest mean; earlier buckets win ties.
pub fn best_sentiment(means: &[SentimentMean]) -> Option<&SentimentMean> {
    means
        .iter()
        .filter(|bucket| bucket.mean_rating.is_some())
        .fold(None, |best: Option<&SentimentMean>, bucket| match best {
            Some(current) if current.mean_rating >= bucket.mean_rating => Some(current),
            _ => Some(bucket),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(day: u32, content: &str, rating: u8) -> Entry {
        Entry::new(NaiveDate::from_ymd_opt(2025, 6, day).unwrap(), content, rating)
    }

    #[test]
    fn tokenize_returns_dictionary_forms() {
        let words = tokenize("昨日食べたケーキ");
        assert!(words.contains(&"昨日".to_string()));
        assert!(words.contains(&"食べる".to_string()));
        assert!(words.contains(&"ケーキ".to_string()));
        assert!(!words.iter().any(|word| word.contains("昨日食")));
    }

    #[test]
    fn tokenize_splits_compounds_and_drops_stop_words() {
        let words = tokenize("今日一日楽しかった");
        assert!(words.contains(&"楽しい".to_string()));
        assert!(!words.contains(&"今日".to_string()));
        assert!(!words.iter().any(|word| word.starts_with("今日")));
    }

    #[test]
    fn tokenize_skips_particles_and_numerals() {
        let words = tokenize("今日は3冊の本を読んだ");
        assert!(words.contains(&"本".to_string()));
        assert!(words.contains(&"読む".to_string()));
        for dropped in ["今日", "は", "の", "を", "3"] {
            assert!(!words.contains(&dropped.to_string()), "{dropped} kept");
        }
    }

    #[test]
    fn shared_word_is_counted_across_compounds() {
        let entries = vec![entry(1, "今日一日散歩した", 3), entry(2, "今日散歩した", 4)];
        let top = keyword_frequency(&entries, 10);
        assert_eq!(top[0].word, "散歩");
        assert_eq!(top[0].count, 2);
        assert!(top.iter().all(|k| k.word != "今日" && k.word != "する"));
    }

    #[test]
    fn sentiment_sees_through_inflection() {
        let words = content_words("試験は辛かったけど楽しかった");
        assert!(Sentiment::Positive.matches(&words));
        assert!(Sentiment::Negative.matches(&words));
        assert!(!Sentiment::Neutral.matches(&words));
    }

    #[test]
    fn keyword_ties_keep_first_seen_order() {
        let entries = vec![
            entry(1, "散歩 読書 散歩", 3),
            entry(2, "料理 読書 映画", 3),
        ];
        let top = keyword_frequency(&entries, 3);
        let words: Vec<_> = top.iter().map(|k| (k.word.as_str(), k.count)).collect();
        assert_eq!(words, vec![("散歩", 2), ("読書", 2), ("料理", 1)]);
    }

    #[test]
    fn entry_can_count_in_several_buckets() {
        let entries = vec![
            entry(1, "楽しい一日だったけど疲れた", 4),
            entry(2, "試験に失敗して悲しい", 1),
            entry(3, "明日の予定を考える", 3),
        ];
        let means = sentiment_means(&entries);
        assert_eq!(means[0].sentiment, Sentiment::Positive);
        assert_eq!(means[0].count, 1);
        assert_eq!(means[0].mean_rating, Some(4.0));
        assert_eq!(means[1].count, 2);
        assert_eq!(means[1].mean_rating, Some(2.5));
        assert_eq!(means[2].mean_rating, Some(3.0));
        assert_eq!(best_sentiment(&means).unwrap().sentiment, Sentiment::Positive);
    }

    #[test]
    fn empty_bucket_has_no_mean() {
        let means = sentiment_means(&[entry(1, "nothing notable", 3)]);
        assert!(means.iter().all(|bucket| bucket.mean_rating.is_none()));
        assert!(best_sentiment(&means).is_none());
    }
}
