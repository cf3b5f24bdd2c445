//! Station local time: IANA zone resolution from city/country names.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use globe_proto::model::Station;
use tracing::{debug, warn};

pub const DEFAULT_ZONES_URL: &str = "https://worldtimeapi.org/api/timezone";

#[derive(Debug, thiserror::Error)]
pub enum TimezoneError {
    #[error("zone list request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("zone list is not a JSON string array: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Primary zone per country, for when the zone list has no better match.
pub const COUNTRY_PRIMARY_ZONE: &[(&str, &str)] = &[
    ("afghanistan", "Asia/Kabul"),
    ("albania", "Europe/Tirane"),
    ("algeria", "Africa/Algiers"),
    ("andorra", "Europe/Andorra"),
    ("angola", "Africa/Luanda"),
    ("antigua and barbuda", "America/Antigua"),
    ("argentina", "America/Argentina/Buenos_Aires"),
    ("armenia", "Asia/Yerevan"),
    ("australia", "Australia/Sydney"),
    ("austria", "Europe/Vienna"),
    ("azerbaijan", "Asia/Baku"),
    ("bahamas", "America/Nassau"),
    ("bahrain", "Asia/Bahrain"),
    ("bangladesh", "Asia/Dhaka"),
    ("barbados", "America/Barbados"),
    ("belarus", "Europe/Minsk"),
    ("belgium", "Europe/Brussels"),
    ("belize", "America/Belize"),
    ("benin", "Africa/Porto-Novo"),
    ("bhutan", "Asia/Thimphu"),
    ("bolivia", "America/La_Paz"),
    ("bosnia and herzegovina", "Europe/Sarajevo"),
    ("botswana", "Africa/Gaborone"),
    ("brazil", "America/Sao_Paulo"),
    ("brunei", "Asia/Brunei"),
    ("bulgaria", "Europe/Sofia"),
    ("burkina faso", "Africa/Ouagadougou"),
    ("burundi", "Africa/Bujumbura"),
    ("cabo verde", "Atlantic/Cape_Verde"),
    ("cambodia", "Asia/Phnom_Penh"),
    ("cameroon", "Africa/Douala"),
    ("canada", "America/Toronto"),
    ("central african republic", "Africa/Bangui"),
    ("chad", "Africa/Ndjamena"),
    ("chile", "America/Santiago"),
    ("china", "Asia/Shanghai"),
    ("colombia", "America/Bogota"),
    ("comoros", "Indian/Comoro"),
    ("congo", "Africa/Brazzaville"),
    ("congo (democratic republic)", "Africa/Kinshasa"),
    ("costa rica", "America/Costa_Rica"),
    ("croatia", "Europe/Zagreb"),
    ("cuba", "America/Havana"),
    ("cyprus", "Asia/Nicosia"),
    ("czechia", "Europe/Prague"),
    ("denmark", "Europe/Copenhagen"),
    ("djibouti", "Africa/Djibouti"),
    ("dominica", "America/Dominica"),
    ("dominican republic", "America/Santo_Domingo"),
    ("ecuador", "America/Guayaquil"),
    ("egypt", "Africa/Cairo"),
    ("el salvador", "America/El_Salvador"),
    ("equatorial guinea", "Africa/Malabo"),
    ("eritrea", "Africa/Asmara"),
    ("estonia", "Europe/Tallinn"),
    ("eswatini", "Africa/Mbabane"),
    ("ethiopia", "Africa/Addis_Ababa"),
    ("fiji", "Pacific/Fiji"),
    ("finland", "Europe/Helsinki"),
    ("france", "Europe/Paris"),
    ("gabon", "Africa/Libreville"),
    ("gambia", "Africa/Banjul"),
    ("georgia", "Asia/Tbilisi"),
    ("germany", "Europe/Berlin"),
    ("ghana", "Africa/Accra"),
    ("greece", "Europe/Athens"),
    ("grenada", "America/Grenada"),
    ("guatemala", "America/Guatemala"),
    ("guinea", "Africa/Conakry"),
    ("guinea-bissau", "Africa/Bissau"),
    ("guyana", "America/Guyana"),
    ("haiti", "America/Port-au-Prince"),
    ("honduras", "America/Tegucigalpa"),
    ("hungary", "Europe/Budapest"),
    ("iceland", "Atlantic/Reykjavik"),
    ("india", "Asia/Kolkata"),
    ("indonesia", "Asia/Jakarta"),
    ("iran", "Asia/Tehran"),
    ("iraq", "Asia/Baghdad"),
    ("ireland", "Europe/Dublin"),
    ("israel", "Asia/Jerusalem"),
    ("italy", "Europe/Rome"),
    ("jamaica", "America/Jamaica"),
    ("japan", "Asia/Tokyo"),
    ("jordan", "Asia/Amman"),
    ("kazakhstan", "Asia/Almaty"),
    ("kenya", "Africa/Nairobi"),
    ("kiribati", "Pacific/Tarawa"),
    ("kuwait", "Asia/Kuwait"),
    ("kyrgyzstan", "Asia/Bishkek"),
    ("laos", "Asia/Vientiane"),
    ("latvia", "Europe/Riga"),
    ("lebanon", "Asia/Beirut"),
    ("lesotho", "Africa/Maseru"),
    ("liberia", "Africa/Monrovia"),
    ("libya", "Africa/Tripoli"),
    ("liechtenstein", "Europe/Vaduz"),
    ("lithuania", "Europe/Vilnius"),
    ("luxembourg", "Europe/Luxembourg"),
    ("madagascar", "Indian/Antananarivo"),
    ("malawi", "Africa/Blantyre"),
    ("malaysia", "Asia/Kuala_Lumpur"),
    ("maldives", "Indian/Maldives"),
    ("mali", "Africa/Bamako"),
    ("malta", "Europe/Malta"),
    ("marshall islands", "Pacific/Majuro"),
    ("mauritania", "Africa/Nouakchott"),
    ("mauritius", "Indian/Mauritius"),
    ("mexico", "America/Mexico_City"),
    ("micronesia", "Pacific/Pohnpei"),
    ("moldova", "Europe/Chisinau"),
    ("monaco", "Europe/Monaco"),
    ("mongolia", "Asia/Ulaanbaatar"),
    ("montenegro", "Europe/Podgorica"),
    ("morocco", "Africa/Casablanca"),
    ("mozambique", "Africa/Maputo"),
    ("myanmar", "Asia/Yangon"),
    ("namibia", "Africa/Windhoek"),
    ("nauru", "Pacific/Nauru"),
    ("nepal", "Asia/Kathmandu"),
    ("netherlands", "Europe/Amsterdam"),
    ("new zealand", "Pacific/Auckland"),
    ("nicaragua", "America/Managua"),
    ("niger", "Africa/Niamey"),
    ("nigeria", "Africa/Lagos"),
    ("north korea", "Asia/Pyongyang"),
    ("north macedonia", "Europe/Skopje"),
    ("norway", "Europe/Oslo"),
    ("oman", "Asia/Muscat"),
    ("pakistan", "Asia/Karachi"),
    ("palau", "Pacific/Palau"),
    ("palestine", "Asia/Gaza"),
    ("panama", "America/Panama"),
    ("papua new guinea", "Pacific/Port_Moresby"),
    ("paraguay", "America/Asuncion"),
    ("peru", "America/Lima"),
    ("philippines", "Asia/Manila"),
    ("poland", "Europe/Warsaw"),
    ("portugal", "Europe/Lisbon"),
    ("qatar", "Asia/Qatar"),
    ("romania", "Europe/Bucharest"),
    ("russia", "Europe/Moscow"),
    ("rwanda", "Africa/Kigali"),
    ("saint kitts and nevis", "America/St_Kitts"),
    ("saint lucia", "America/St_Lucia"),
    ("saint vincent and the grenadines", "America/St_Vincent"),
    ("samoa", "Pacific/Apia"),
    ("san marino", "Europe/San_Marino"),
    ("sao tome and principe", "Africa/Sao_Tome"),
    ("saudi arabia", "Asia/Riyadh"),
    ("senegal", "Africa/Dakar"),
    ("serbia", "Europe/Belgrade"),
    ("seychelles", "Indian/Mahe"),
    ("sierra leone", "Africa/Freetown"),
    ("singapore", "Asia/Singapore"),
    ("slovakia", "Europe/Bratislava"),
    ("slovenia", "Europe/Ljubljana"),
    ("solomon islands", "Pacific/Guadalcanal"),
    ("somalia", "Africa/Mogadishu"),
    ("south africa", "Africa/Johannesburg"),
    ("south korea", "Asia/Seoul"),
    ("south sudan", "Africa/Juba"),
    ("spain", "Europe/Madrid"),
    ("sri lanka", "Asia/Colombo"),
    ("sudan", "Africa/Khartoum"),
    ("suriname", "America/Paramaribo"),
    ("sweden", "Europe/Stockholm"),
    ("switzerland", "Europe/Zurich"),
    ("syria", "Asia/Damascus"),
    ("taiwan", "Asia/Taipei"),
    ("tajikistan", "Asia/Dushanbe"),
    ("tanzania", "Africa/Dar_es_Salaam"),
    ("thailand", "Asia/Bangkok"),
    ("timor-leste", "Asia/Dili"),
    ("togo", "Africa/Lome"),
    ("tonga", "Pacific/Tongatapu"),
    ("trinidad and tobago", "America/Port_of_Spain"),
    ("tunisia", "Africa/Tunis"),
    ("turkey", "Europe/Istanbul"),
    ("turkmenistan", "Asia/Ashgabat"),
    ("tuvalu", "Pacific/Funafuti"),
    ("uganda", "Africa/Kampala"),
    ("ukraine", "Europe/Kyiv"),
    ("united arab emirates", "Asia/Dubai"),
    ("united kingdom", "Europe/London"),
    ("united states", "America/New_York"),
    ("uruguay", "America/Montevideo"),
    ("uzbekistan", "Asia/Tashkent"),
    ("vanuatu", "Pacific/Efate"),
    ("vatican city", "Europe/Vatican"),
    ("venezuela", "America/Caracas"),
    ("vietnam", "Asia/Ho_Chi_Minh"),
    ("yemen", "Asia/Aden"),
    ("zambia", "Africa/Lusaka"),
    ("zimbabwe", "Africa/Harare"),
];

/// Lowercase ASCII letters only.
pub fn normalize_place(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase())
        .collect()
}

/// `city|country`, lowercased.
pub fn cache_key(city: &str, country: &str) -> String {
    format!("{}|{}", city, country).to_lowercase()
}

fn find_in_zones(needle: &str, zones: &[String]) -> Option<String> {
    zones
        .iter()
        .find(|z| {
            z.to_lowercase()
                .chars()
                .filter(|c| !(*c == '_' || *c == '-' || c.is_whitespace()))
                .collect::<String>()
                .contains(needle)
        })
        .or_else(|| zones.iter().find(|z| z.to_lowercase().contains(needle)))
        .cloned()
}

pub fn primary_zone(country: &str) -> Option<&'static str> {
    let wanted = normalize_place(country);
    if wanted.is_empty() {
        return None;
    }
    COUNTRY_PRIMARY_ZONE
        .iter()
        .find(|(name, _)| normalize_place(name) == wanted)
        .map(|(_, zone)| *zone)
}

/// City against the zone ids first, then country, then the static
/// country table.
pub fn match_zone(city: &str, country: &str, zones: &[String]) -> Option<String> {
    let city_norm = normalize_place(city);
    let country_norm = normalize_place(country);
    if !city_norm.is_empty() {
        if let Some(zone) = find_in_zones(&city_norm, zones) {
            return Some(zone);
        }
    }
    if !country_norm.is_empty() {
        if let Some(zone) = find_in_zones(&country_norm, zones) {
            return Some(zone);
        }
    }
    primary_zone(country).map(str::to_string)
}

/// Resolution given the outcome of the zone-list fetch.  A failed fetch
/// falls back to the static table.
pub fn resolve(city: &str, country: &str, zones: Result<&[String], &TimezoneError>) -> Option<String> {
    match zones {
        Ok(zones) => match_zone(city, country, zones),
        Err(e) => {
            debug!("zone list unavailable ({}), using country table", e);
            primary_zone(country).map(str::to_string)
        }
    }
}

/// Wall-clock `HH:MM` in `zone`.  `None` for ids chrono-tz does not know.
pub fn local_time_label(zone: &str, now: DateTime<Utc>) -> Option<String> {
    let tz: chrono_tz::Tz = zone.parse().ok()?;
    Some(now.with_timezone(&tz).format("%H:%M").to_string())
}

pub async fn fetch_zone_list(url: &str) -> Result<Vec<String>, TimezoneError> {
    let response = reqwest::Client::new()
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;
    let zones: Vec<String> = serde_json::from_str(&body)?;
    debug!("fetched {} zone ids", zones.len());
    Ok(zones)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneLookup {
    Known(String),
    Unknown,
    /// Not resolved yet; the caller should request a lookup.
    Unresolved,
}

/// A lookup the host should run off the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub key: String,
    pub city: String,
    pub country: String,
}

/// Per-session cache keyed by [`cache_key`].
#[derive(Debug, Default)]
pub struct TimezoneResolver {
    resolved: HashMap<String, Option<String>>,
    pending: HashSet<String>,
    enabled: bool,
}

impl TimezoneResolver {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn lookup(&self, station: &Station) -> ZoneLookup {
        if let Some(zone) = station.timezone() {
            return ZoneLookup::Known(zone.to_string());
        }
        match self.resolved.get(&cache_key(&station.city, &station.country)) {
            Some(Some(zone)) => ZoneLookup::Known(zone.clone()),
            Some(None) => ZoneLookup::Unknown,
            None if self.enabled => ZoneLookup::Unresolved,
            None => primary_zone(&station.country)
                .map(|z| ZoneLookup::Known(z.to_string()))
                .unwrap_or(ZoneLookup::Unknown),
        }
    }

    /// Marks the station's key pending and returns the request, unless it
    /// is already resolved or in flight.
    pub fn request(&mut self, station: &Station) -> Option<ResolveRequest> {
        if self.lookup(station) != ZoneLookup::Unresolved {
            return None;
        }
        let key = cache_key(&station.city, &station.country);
        if !self.pending.insert(key.clone()) {
            return None;
        }
        Some(ResolveRequest {
            key,
            city: station.city.clone(),
            country: station.country.clone(),
        })
    }

    pub fn complete(&mut self, key: String, zone: Option<String>) {
        self.pending.remove(&key);
        if zone.is_none() {
            warn!("no timezone for {}", key);
        }
        self.resolved.insert(key, zone);
    }

    /// `HH:MM` for the station, `None` while unresolved or unknown.
    pub fn label(&self, station: &Station, now: DateTime<Utc>) -> Option<String> {
        match self.lookup(station) {
            ZoneLookup::Known(zone) => local_time_label(&zone, now),
            ZoneLookup::Unknown | ZoneLookup::Unresolved => None,
        }
    }
}
