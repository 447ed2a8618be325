pub const IMAGE_PREFIX: &str = "image_";
pub const IMAGE_EXTENSION: &str = "jpg";

/// Name of the `ordinal`-th unique payload: `image_{ordinal}.jpg`.
pub fn image_file_name(ordinal: u64) -> String {
    format!("{IMAGE_PREFIX}{ordinal}.{IMAGE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::image_file_name;

    #[test]
    fn names_are_sequential_and_one_based() {
        assert_eq!(image_file_name(1), "image_1.jpg");
        assert_eq!(image_file_name(42), "image_42.jpg");
    }
}
