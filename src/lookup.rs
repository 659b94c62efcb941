// Static naming tables for the vehicles and tyres in the dataset

pub const ALL_VEHICLES: &[&str] = &["eGolf", "ID.4", "Q8", "Taycan"];

/// Spellings found in filenames and notes, mapped to a name in [`ALL_VEHICLES`].
pub const VEHICLE_CLEAN_NAMES: &[(&str, &str)] = &[
    ("e-Golf", "eGolf"),
    ("E-Golf", "eGolf"),
    ("VW eGolf", "eGolf"),
    ("ID4", "ID.4"),
    ("VW ID4", "ID.4"),
    ("Q8 e-tron", "Q8"),
    ("AudiQ8", "Q8"),
    ("Porsche", "Taycan"),
];

pub const ALL_TYRES: &[&str] = &[
    "EcoContact 6 Q",
    "RainSport 5",
    "PremiumContact 6 AO",
    "P-Zero R",
    "Ventus S1 evo 3 ev",
    "Summer SRTT",
];

/// Short tyre names, mapped to a name in [`ALL_TYRES`].
pub const TYRE_CLEAN_NAMES: &[(&str, &str)] = &[
    ("PremiumContact 6", "PremiumContact 6 AO"),
    ("Ventus S1 Evo 3", "Ventus S1 evo 3 ev"),
    ("P-Zero", "P-Zero R"),
];

fn clean_name(
    name: &str,
    canonical: &'static [&'static str],
    aliases: &'static [(&'static str, &'static str)],
) -> Option<&'static str> {
    canonical
        .iter()
        .find(|c| **c == name)
        .copied()
        .or_else(|| aliases.iter().find(|(alias, _)| *alias == name).map(|(_, c)| *c))
}

/// Canonical vehicle name for a canonical name or a known alias.
pub fn clean_vehicle_name(name: &str) -> Option<&'static str> {
    clean_name(name, ALL_VEHICLES, VEHICLE_CLEAN_NAMES)
}

/// Canonical tyre name for a canonical name or a known alias.
pub fn clean_tyre_name(name: &str) -> Option<&'static str> {
    clean_name(name, ALL_TYRES, TYRE_CLEAN_NAMES)
}
