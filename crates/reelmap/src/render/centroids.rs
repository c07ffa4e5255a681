use crate::geocode::Coordinate;

/// Approximate geographic centres, keyed by the country names used in the
/// locations list.
const COUNTRY_CENTROIDS: &[(&str, f64, f64)] = &[
    ("Afghanistan", 33.94, 67.71),
    ("Algeria", 28.03, 1.66),
    ("Argentina", -38.42, -63.62),
    ("Australia", -25.27, 133.78),
    ("Austria", 47.52, 14.55),
    ("Bahamas", 25.03, -77.40),
    ("Bangladesh", 23.68, 90.36),
    ("Belarus", 53.71, 27.95),
    ("Belgium", 50.50, 4.47),
    ("Bolivia", -16.29, -63.59),
    ("Bosnia and Herzegovina", 43.92, 17.68),
    ("Brazil", -14.24, -51.93),
    ("Bulgaria", 42.73, 25.49),
    ("Cambodia", 12.57, 104.99),
    ("Canada", 56.13, -106.35),
    ("Chile", -35.68, -71.54),
    ("China", 35.86, 104.20),
    ("Colombia", 4.57, -74.30),
    ("Costa Rica", 9.75, -83.75),
    ("Croatia", 45.10, 15.20),
    ("Cuba", 21.52, -77.78),
    ("Cyprus", 35.13, 33.43),
    ("Czech Republic", 49.82, 15.47),
    ("Denmark", 56.26, 9.50),
    ("Dominican Republic", 18.74, -70.16),
    ("Ecuador", -1.83, -78.18),
    ("Egypt", 26.82, 30.80),
    ("Estonia", 58.60, 25.01),
    ("Ethiopia", 9.15, 40.49),
    ("Finland", 61.92, 25.75),
    ("France", 46.23, 2.21),
    ("Georgia", 42.32, 43.36),
    ("Germany", 51.17, 10.45),
    ("Ghana", 7.95, -1.02),
    ("Greece", 39.07, 21.82),
    ("Hong Kong", 22.40, 114.11),
    ("Hungary", 47.16, 19.50),
    ("Iceland", 64.96, -19.02),
    ("India", 20.59, 78.96),
    ("Indonesia", -0.79, 113.92),
    ("Iran", 32.43, 53.69),
    ("Iraq", 33.22, 43.68),
    ("Ireland", 53.41, -8.24),
    ("Israel", 31.05, 34.85),
    ("Italy", 41.87, 12.57),
    ("Jamaica", 18.11, -77.30),
    ("Japan", 36.20, 138.25),
    ("Jordan", 30.59, 36.24),
    ("Kazakhstan", 48.02, 66.92),
    ("Kenya", -0.02, 37.91),
    ("Latvia", 56.88, 24.60),
    ("Lebanon", 33.85, 35.86),
    ("Lithuania", 55.17, 23.88),
    ("Luxembourg", 49.82, 6.13),
    ("Malaysia", 4.21, 101.98),
    ("Malta", 35.94, 14.38),
    ("Mexico", 23.63, -102.55),
    ("Morocco", 31.79, -7.09),
    ("Nepal", 28.39, 84.12),
    ("Netherlands", 52.13, 5.29),
    ("New Zealand", -40.90, 174.89),
    ("Nigeria", 9.08, 8.68),
    ("North Korea", 40.34, 127.51),
    ("Norway", 60.47, 8.47),
    ("Pakistan", 30.38, 69.35),
    ("Peru", -9.19, -75.02),
    ("Philippines", 12.88, 121.77),
    ("Poland", 51.92, 19.15),
    ("Portugal", 39.40, -8.22),
    ("Puerto Rico", 18.22, -66.59),
    ("Romania", 45.94, 24.97),
    ("Russia", 61.52, 105.32),
    ("Saudi Arabia", 23.89, 45.08),
    ("Serbia", 44.02, 21.01),
    ("Singapore", 1.35, 103.82),
    ("Slovakia", 48.67, 19.70),
    ("Slovenia", 46.15, 14.99),
    ("South Africa", -30.56, 22.94),
    ("South Korea", 35.91, 127.77),
    ("Spain", 40.46, -3.75),
    ("Sri Lanka", 7.87, 80.77),
    ("Sweden", 60.13, 18.64),
    ("Switzerland", 46.82, 8.23),
    ("Taiwan", 23.70, 120.96),
    ("Thailand", 15.87, 100.99),
    ("Tunisia", 33.89, 9.54),
    ("Turkey", 38.96, 35.24),
    ("UK", 55.38, -3.44),
    ("USA", 37.09, -95.71),
    ("Ukraine", 48.38, 31.17),
    ("United Arab Emirates", 23.42, 53.85),
    ("Uruguay", -32.52, -55.77),
    ("Venezuela", 6.42, -66.59),
    ("Vietnam", 14.06, 108.28),
];

/// Approximate centre of `country`, if known.
pub fn country_centroid(country: &str) -> Option<Coordinate> {
    COUNTRY_CENTROIDS
        .iter()
        .find(|(name, _, _)| *name == country)
        .map(|&(_, latitude, longitude)| Coordinate::new(latitude, longitude))
}
