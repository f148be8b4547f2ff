use crate::config::ContentConfig;
use crate::prayer::Anchor;
use anyhow::{Context, Result};
use chrono::NaiveTime;
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::warn;

/// Kinds of opaque text the provider can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// Daily verse, fetched remotely with a static fallback.
    Verse,
    /// Short supplication from the built-in pool.
    Dua,
    /// Short quote from the built-in pool.
    Quote,
}

/// Supplications carried over from the bot's built-in pool.
const DUAS: &[&str] = &[
    "🤲 اللّٰهُمَّ اِنِّی اَسْأَلُکَ الْعَفْوَ وَالْعَافِیَةَ۔",
    "🕊️ اَسْتَغْفِرُاللّٰهَ رَبِّی مِنْ كُلِّ ذَنْبٍ۔",
    "💫 اللّٰہُمَّ اِنِّیْ اَسْأَلُکَ رِضَاکَ وَالْجَنَّةَ۔",
    "🌙 رَبِّ زِدْنِی عِلْمًا۔",
    "💖 سُبْحَانَ اللّٰهِ وَبِحَمْدِهِ، سُبْحَانَ اللّٰهِ الْعَظِیْمِ۔",
];

const QUOTES: &[&str] = &[
    "✨ اللّٰہ جسے چاہے عزت دے، جسے چاہے آزمائے۔",
    "🤍 صبر ایمان کا آدھا حصہ ہے۔",
    "💫 دعا مومن کا ہتھیار ہے۔",
    "🌙 نیکی چھوٹی نہیں ہوتی، نیت بڑی ہوتی ہے۔",
    "🕊️ جو اللّٰہ پر بھروسہ کرے، اللّٰہ اس کے لیے کافی ہے۔",
];

/// Fallback verses used when the remote fetch fails or times out.
const FALLBACK_VERSES: &[&str] = &[
    "📖 فَاذْكُرُونِي أَذْكُرْكُمْ\n— Surah Al-Baqarah (152)",
    "📖 إِنَّ مَعَ الْعُسْرِ يُسْرًا\n— Surah Ash-Sharh (6)",
    "📖 وَقُل رَّبِّ زِدْنِي عِلْمًا\n— Surah Ta-Ha (114)",
];

/// Produces notification body text; never fails.
///
/// Remote kinds fall back to the built-in pools on any transport or
/// payload error, so the scheduler can treat every fetch as infallible.
pub struct ContentProvider {
    client: reqwest::Client,
    verse_url: String,
}

impl ContentProvider {
    pub fn new(config: &ContentConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            verse_url: config.verse_url.clone(),
        }
    }

    /// Fetch text of the given kind, falling back to static content.
    pub async fn fetch(&self, kind: ContentKind) -> String {
        match kind {
            ContentKind::Verse => match self.fetch_remote_verse().await {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Verse fetch failed, using fallback");
                    pick(FALLBACK_VERSES)
                }
            },
            ContentKind::Dua => pick(DUAS),
            ContentKind::Quote => pick(QUOTES),
        }
    }

    /// GET the configured random-verse endpoint (Al-Quran Cloud format).
    async fn fetch_remote_verse(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.verse_url)
            .send()
            .await
            .context("Failed to reach verse endpoint")?;

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse verse payload")?;

        let text = body["data"]["text"]
            .as_str()
            .context("Verse payload missing text")?;
        let surah = body["data"]["surah"]["englishName"].as_str().unwrap_or("");
        let number = body["data"]["numberInSurah"].as_u64().unwrap_or(0);

        Ok(format!("📖 {}\n— Surah {} ({})", text, surah, number))
    }
}

fn pick(pool: &[&str]) -> String {
    pool.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("")
        .to_string()
}

/// Azan announcement for an anchor's exact instant.
pub fn adhan_message(anchor: Anchor, at: Option<NaiveTime>) -> String {
    match at {
        Some(at) => format!(
            "🕌 It is time for {} prayer ({}). Allahu Akbar! 🤲",
            anchor.display_name(),
            at.format("%H:%M"),
        ),
        None => format!("🕌 It is time for {} prayer. Allahu Akbar! 🤲", anchor.display_name()),
    }
}

/// Pre-reminder ahead of an anchor.
pub fn pre_reminder_message(anchor: Anchor, minutes: i64, at: Option<NaiveTime>) -> String {
    match at {
        Some(at) => format!(
            "⏰ {} prayer is in {} minutes (at {}).",
            anchor.display_name(),
            minutes,
            at.format("%H:%M"),
        ),
        None => format!("⏰ {} prayer is in {} minutes.", anchor.display_name(), minutes),
    }
}

/// Weekly broadcast greeting.
pub fn jumua_greeting() -> &'static str {
    "🌸 جمعہ مبارک 🌸\nاللّٰہ ہمیں اپنے ذکر سے منور کرے 🤲"
}
