/// Image scan service adapters
mod http_image_scanner;
mod unavailable_scanner;

pub use http_image_scanner::HttpImageScanner;
pub use unavailable_scanner::UnavailableScanner;
