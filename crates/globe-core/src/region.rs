//! Continent / country filtering of markers.

use std::collections::HashSet;

use globe_proto::model::Station;

use crate::markers::{MarkerId, MarkerRegistry};
use crate::scene::SceneBackend;

pub const AFRICA: &[&str] = &[
    "Algeria", "Angola", "Benin", "Botswana", "Burkina Faso", "Burundi", "Cabo Verde",
    "Cameroon", "Central African Republic", "Chad", "Comoros", "Congo",
    "Democratic Republic of the Congo", "Djibouti", "Egypt", "Equatorial Guinea", "Eritrea",
    "Eswatini", "Ethiopia", "Gabon", "Gambia", "Ghana", "Guinea", "Guinea-Bissau",
    "Ivory Coast", "Kenya", "Lesotho", "Liberia", "Libya", "Madagascar", "Malawi", "Mali",
    "Mauritania", "Mauritius", "Morocco", "Mozambique", "Namibia", "Niger", "Nigeria", "Rwanda",
    "Sao Tome and Principe", "Senegal", "Seychelles", "Sierra Leone", "Somalia", "South Africa",
    "South Sudan", "Sudan", "Tanzania", "Togo", "Tunisia", "Uganda", "Western Sahara", "Zambia",
    "Zimbabwe",
];

pub const ASIA: &[&str] = &[
    "Afghanistan", "Armenia", "Azerbaijan", "Bahrain", "Bangladesh", "Bhutan", "Brunei",
    "Cambodia", "China", "Cyprus", "East Timor", "Georgia", "India", "Indonesia", "Iran",
    "Iraq", "Israel", "Japan", "Jordan", "Kazakhstan", "Kuwait", "Kyrgyzstan", "Laos",
    "Lebanon", "Malaysia", "Maldives", "Mongolia", "Myanmar", "Nepal", "North Korea", "Oman",
    "Pakistan", "Palestine", "Philippines", "Qatar", "Russia", "Saudi Arabia", "Singapore",
    "South Korea", "Sri Lanka", "Syria", "Taiwan", "Tajikistan", "Thailand", "Turkey",
    "Turkmenistan", "United Arab Emirates", "Uzbekistan", "Vietnam", "Yemen",
];

pub const EUROPE: &[&str] = &[
    "Albania", "Andorra", "Armenia", "Austria", "Azerbaijan", "Belarus", "Belgium",
    "Bosnia and Herzegovina", "Bulgaria", "Croatia", "Cyprus", "Czechia", "Denmark", "Estonia",
    "Finland", "France", "Georgia", "Germany", "Greece", "Hungary", "Iceland", "Ireland",
    "Italy", "Kazakhstan", "Kosovo", "Latvia", "Liechtenstein", "Lithuania", "Luxembourg",
    "Malta", "Moldova", "Monaco", "Montenegro", "Netherlands", "North Macedonia", "Norway",
    "Poland", "Portugal", "Romania", "Russia", "San Marino", "Serbia", "Slovakia", "Slovenia",
    "Spain", "Sweden", "Switzerland", "Ukraine", "United Kingdom", "Vatican City",
];

pub const NORTH_AMERICA: &[&str] = &[
    "Antigua and Barbuda", "Bahamas", "Barbados", "Belize", "Canada", "Costa Rica", "Cuba",
    "Dominica", "Dominican Republic", "El Salvador", "Grenada", "Guatemala", "Haiti",
    "Honduras", "Jamaica", "Mexico", "Nicaragua", "Panama", "Saint Kitts and Nevis",
    "Saint Lucia", "Saint Vincent and the Grenadines", "Trinidad and Tobago", "United States",
];

pub const SOUTH_AMERICA: &[&str] = &[
    "Argentina", "Bolivia", "Brazil", "Chile", "Colombia", "Ecuador", "Guyana", "Paraguay",
    "Peru", "Suriname", "Uruguay", "Venezuela",
];

pub const OCEANIA: &[&str] = &[
    "Australia", "Fiji", "Kiribati", "Marshall Islands", "Micronesia", "Nauru", "New Zealand",
    "Palau", "Papua New Guinea", "Samoa", "Solomon Islands", "Tonga", "Tuvalu", "Vanuatu",
];

pub const ANTARCTICA: &[&str] = &[
    "Antarctica",
];

pub const CONTINENTS: &[(&str, &[&str])] = &[
    ("Africa", AFRICA),
    ("Asia", ASIA),
    ("Europe", EUROPE),
    ("North America", NORTH_AMERICA),
    ("South America", SOUTH_AMERICA),
    ("Oceania", OCEANIA),
    ("Antarctica", ANTARCTICA),
];

pub fn continents() -> impl Iterator<Item = &'static str> {
    CONTINENTS.iter().map(|(name, _)| *name)
}

pub fn countries_of(continent: &str) -> Option<&'static [&'static str]> {
    CONTINENTS
        .iter()
        .find(|(name, _)| *name == continent)
        .map(|(_, countries)| *countries)
}

/// Lowercase with all whitespace removed.
pub fn normalize_country(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionSelection {
    pub continent: Option<String>,
    pub country: Option<String>,
}

impl RegionSelection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn continent(name: &str) -> Self {
        Self {
            continent: Some(name.to_string()),
            country: None,
        }
    }

    pub fn country(continent: &str, country: &str) -> Self {
        Self {
            continent: Some(continent.to_string()),
            country: Some(country.to_string()),
        }
    }

    fn selected_country(&self) -> Option<&str> {
        self.country.as_deref().filter(|c| !c.is_empty())
    }

    fn selected_continent(&self) -> Option<&str> {
        self.continent.as_deref().filter(|c| !c.is_empty())
    }

    pub fn is_all(&self) -> bool {
        self.selected_continent().is_none() && self.selected_country().is_none()
    }

    /// Normalized country names a station must match, or `None` when every
    /// station passes.  A country wins over its continent; an unknown
    /// continent yields an empty set.
    pub fn candidates(&self) -> Option<HashSet<String>> {
        if let Some(country) = self.selected_country() {
            return Some(HashSet::from([normalize_country(country)]));
        }
        let continent = self.selected_continent()?;
        let countries = countries_of(continent).unwrap_or(&[]);
        Some(countries.iter().map(|c| normalize_country(c)).collect())
    }

    pub fn matches(&self, station: &Station) -> bool {
        match self.candidates() {
            None => true,
            Some(set) => set.contains(&normalize_country(&station.country)),
        }
    }
}

/// Recomputes visibility of every marker from scratch.  Returns the ids left
/// visible.
pub fn apply(
    selection: &RegionSelection,
    registry: &mut MarkerRegistry,
    scene: &mut dyn SceneBackend,
) -> Vec<MarkerId> {
    match selection.candidates() {
        None => registry.set_visibility(|_| true, scene),
        Some(set) => registry.set_visibility(|s| set.contains(&normalize_country(&s.country)), scene),
    }
}
