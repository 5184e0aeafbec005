//! Stringified bundle wrapper.
//! Uses `{}` placeholder for the base64 encoded bundle - replace before use.

pub const STRINGIFIED_TEMPLATE: &str = "local CodeString = '{}'\nreturn CodeString";

/// Wrap an already base64 encoded bundle into a Lua chunk returning it.
pub fn wrap(encoded: &str) -> String {
    STRINGIFIED_TEMPLATE.replace("{}", encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("YQ=="), "local CodeString = 'YQ=='\nreturn CodeString");
    }
}
