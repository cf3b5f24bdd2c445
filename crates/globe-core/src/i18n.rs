//! UI chrome strings in English, Italian and Chinese.

use globe_proto::state::LANG_KEY;
use globe_proto::storage::KeyValueStore;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    En,
    It,
    #[default]
    Zh,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::It, Language::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
            Language::Zh => "zh",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "it" => Some(Language::It),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Language::En => Language::It,
            Language::It => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKey {
    All,
    Favorites,
    History,
    StationList,
    Back,
    Search,
    SelectContinent,
    SelectCountry,
    RegionFilter,
    NoStation,
    Homepage,
    Play,
    Pause,
    Loading,
    Timeout,
    Failed,
    SelectStation,
    Country,
    City,
    Unknown,
}

pub fn text(lang: Language, key: TextKey) -> &'static str {
    use TextKey::*;
    match lang {
        Language::En => match key {
            All => "All",
            Favorites => "Favorites",
            History => "History",
            StationList => "Station List",
            Back => "Back",
            Search => "Search station/country/city...",
            SelectContinent => "Select Continent",
            SelectCountry => "Select Country",
            RegionFilter => "Region Filter",
            NoStation => "No station",
            Homepage => "Homepage",
            Play => "Play",
            Pause => "Pause",
            Loading => "Loading...",
            Timeout => "Timeout",
            Failed => "Failed",
            SelectStation => "Select a station",
            Country => "Country",
            City => "City",
            Unknown => "Unknown",
        },
        Language::It => match key {
            All => "Tutte",
            Favorites => "Preferiti",
            History => "Cronologia",
            StationList => "Elenco Stazioni",
            Back => "Indietro",
            Search => "Cerca stazione/paese/città...",
            SelectContinent => "Seleziona Continente",
            SelectCountry => "Seleziona Paese",
            RegionFilter => "Filtro Regione",
            NoStation => "Nessuna stazione",
            Homepage => "Homepage",
            Play => "Riproduci",
            Pause => "Pausa",
            Loading => "Caricamento...",
            Timeout => "Timeout",
            Failed => "Errore",
            SelectStation => "Seleziona una stazione",
            Country => "Paese",
            City => "Città",
            Unknown => "Sconosciuto",
        },
        Language::Zh => match key {
            All => "全部",
            Favorites => "收藏",
            History => "历史",
            StationList => "电台列表",
            Back => "返回",
            Search => "搜索电台/国家/城市...",
            SelectContinent => "选择大洲",
            SelectCountry => "选择国家",
            RegionFilter => "地区筛选",
            NoStation => "无电台",
            Homepage => "主页",
            Play => "播放",
            Pause => "暂停",
            Loading => "加载中...",
            Timeout => "加载超时",
            Failed => "播放失败",
            SelectStation => "选择电台",
            Country => "国家",
            City => "城市",
            Unknown => "Unknown",
        },
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LocaleError {
    #[error("unknown language code {0:?}")]
    UnknownLanguage(String),
}

/// Current language plus persistence of the user's choice under `lang`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Localizer {
    language: Language,
}

impl Localizer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Persisted choice first, then `fallback_code`, then Chinese.
    pub fn load(store: &dyn KeyValueStore, fallback_code: &str) -> Self {
        let language = store
            .get(LANG_KEY)
            .and_then(|code| Language::from_code(&code))
            .or_else(|| Language::from_code(fallback_code))
            .unwrap_or_default();
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn text(&self, key: TextKey) -> &'static str {
        text(self.language, key)
    }

    /// Switches and persists.  Unknown codes leave the language untouched.
    pub fn set_language(&mut self, code: &str, store: &mut dyn KeyValueStore) -> Result<Language, LocaleError> {
        let language =
            Language::from_code(code).ok_or_else(|| LocaleError::UnknownLanguage(code.to_string()))?;
        self.language = language;
        if let Err(e) = store.set(LANG_KEY, language.code()) {
            warn!("failed to persist language: {}", e);
        }
        info!("language set to {}", language.code());
        Ok(language)
    }
}
