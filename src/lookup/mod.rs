pub mod openfoodfacts;

pub use openfoodfacts::OpenFoodFactsClient;
