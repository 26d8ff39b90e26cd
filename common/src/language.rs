//! 診断言語
//!
//! コードは元のアプリと同じ小文字英名（`hindi` 等）。
//! プロンプトには英名＋母語表記を埋め込む。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Bengali,
    Telugu,
    Marathi,
    Tamil,
    Gujarati,
    Urdu,
    Kannada,
    Odia,
    Punjabi,
    Malayalam,
    Assamese,
    Sanskrit,
    Nepali,
    Sindhi,
    Konkani,
    Manipuri,
    Bodo,
    Dogri,
    Kashmiri,
    Santali,
    Maithili,
}

impl Language {
    /// 選択肢の表示順（English, Hindiを先頭）
    pub const ALL: [Language; 23] = [
        Language::English,
        Language::Hindi,
        Language::Bengali,
        Language::Telugu,
        Language::Marathi,
        Language::Tamil,
        Language::Gujarati,
        Language::Urdu,
        Language::Kannada,
        Language::Odia,
        Language::Punjabi,
        Language::Malayalam,
        Language::Assamese,
        Language::Sanskrit,
        Language::Nepali,
        Language::Sindhi,
        Language::Konkani,
        Language::Manipuri,
        Language::Bodo,
        Language::Dogri,
        Language::Kashmiri,
        Language::Santali,
        Language::Maithili,
    ];

    /// 未知コードは None
    pub fn from_code(code: &str) -> Option<Language> {
        let code = code.trim().to_lowercase();
        Self::ALL.iter().copied().find(|l| l.code() == code)
    }

    /// 未知コードは English にフォールバック
    pub fn from_code_or_default(code: &str) -> Language {
        Self::from_code(code).unwrap_or_default()
    }

    pub fn code(&self) -> &'static str {
        self.entry().0
    }

    pub fn name(&self) -> &'static str {
        self.entry().1
    }

    pub fn native_name(&self) -> &'static str {
        self.entry().2
    }

    /// プロンプトに埋め込む言語名（例: "Hindi (हिंदी)"）
    pub fn prompt_name(&self) -> String {
        match self {
            Language::English => "English".to_string(),
            _ => format!("{} ({})", self.name(), self.native_name()),
        }
    }

    fn entry(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Language::English => ("english", "English", "English"),
            Language::Hindi => ("hindi", "Hindi", "हिंदी"),
            Language::Bengali => ("bengali", "Bengali", "বাংলা"),
            Language::Telugu => ("telugu", "Telugu", "తెలుగు"),
            Language::Marathi => ("marathi", "Marathi", "मराठी"),
            Language::Tamil => ("tamil", "Tamil", "தமிழ்"),
            Language::Gujarati => ("gujarati", "Gujarati", "ગુજરાતી"),
            Language::Urdu => ("urdu", "Urdu", "اردو"),
            Language::Kannada => ("kannada", "Kannada", "ಕನ್ನಡ"),
            Language::Odia => ("odia", "Odia", "ଓଡ଼ିଆ"),
            Language::Punjabi => ("punjabi", "Punjabi", "ਪੰਜਾਬੀ"),
            Language::Malayalam => ("malayalam", "Malayalam", "മലയാളം"),
            Language::Assamese => ("assamese", "Assamese", "অসমীয়া"),
            Language::Sanskrit => ("sanskrit", "Sanskrit", "संस्कृत"),
            Language::Nepali => ("nepali", "Nepali", "नेपाली"),
            Language::Sindhi => ("sindhi", "Sindhi", "سنڌی"),
            Language::Konkani => ("konkani", "Konkani", "कोंकणी"),
            Language::Manipuri => ("manipuri", "Manipuri", "মৈতৈলোন্"),
            Language::Bodo => ("bodo", "Bodo", "बर'"),
            Language::Dogri => ("dogri", "Dogri", "डोगरी"),
            Language::Kashmiri => ("kashmiri", "Kashmiri", "کٲشُر"),
            Language::Santali => ("santali", "Santali", "ᱥᱟᱱᱛᱟᱞᱤ"),
            Language::Maithili => ("maithili", "Maithili", "मैथिली"),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_code(s).ok_or_else(|| {
            format!("Unknown language: {}. Run `leaf-doctor languages` for the list", s)
        })
    }
}
