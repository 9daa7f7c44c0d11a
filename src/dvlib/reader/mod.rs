mod core;
mod dog_api_reader;
mod from_cfg;
mod http_reader;

pub use self::core::{DecodeImage, FetchBytes, FetchImageUrls, ImageCrateDecoder};
pub use dog_api_reader::{parse_random_images, DogApiReader};
pub use from_cfg::{loader_from_cfg, navigator_from_cfg};
pub use http_reader::HttpReader;
