use crate::models::Coordinates;

/// Country centroid used for any city not in the table
pub const DEFAULT_COORDINATES: Coordinates = Coordinates {
    latitude: 20.5937,
    longitude: 78.9629,
};

const CITIES: &[(&str, f64, f64)] = &[
    ("delhi", 28.6139, 77.2090),
    ("mumbai", 19.0760, 72.8777),
    ("chennai", 13.0827, 80.2707),
    ("bangalore", 12.9716, 77.5946),
    ("kolkata", 22.5726, 88.3639),
    ("hyderabad", 17.3850, 78.4867),
    ("pune", 18.5204, 73.8567),
    ("ahmedabad", 23.0225, 72.5714),
    ("jaipur", 26.9124, 75.7873),
    ("lucknow", 26.8467, 80.9462),
    ("kochi", 9.9312, 76.2673),
    ("goa", 15.2993, 74.1240),
    ("shimla", 31.1048, 77.1734),
    ("darjeeling", 27.0412, 88.2663),
];

/// Coordinates for `city`, matched case-insensitively after trimming.
///
/// Returns `None` for cities outside the table.
pub fn coordinates_for(city: &str) -> Option<Coordinates> {
    let key = city.trim();
    CITIES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(key))
        .map(|&(_, latitude, longitude)| Coordinates {
            latitude,
            longitude,
        })
}

/// Names of every city with known coordinates
pub fn known_cities() -> impl Iterator<Item = &'static str> {
    CITIES.iter().map(|(name, _, _)| *name)
}
