//! Contact details shown on the impressum page.
//!
//! Values are obscured before they reach the HTML so that address harvesters
//! reading the raw markup find nothing usable; the page script undoes
//! [`obscure`] in the browser.

use base64::{Engine as _, engine::general_purpose::STANDARD};

/// Substitutions applied in order before reversing.
const SUBSTITUTIONS: [(&str, &str); 7] = [
    ("@", " ]at[ "),
    (".", " ]dot[ "),
    (",", " ]comma[ "),
    ("+49", " ]DE[ "),
    ("+1", " ]US[ "),
    ("+44", " ]UK[ "),
    ("+33", " ]FR[ "),
];

/// Tokenise separators and country prefixes, reverse the characters, then
/// base64-encode the UTF-8 bytes.
pub fn obscure(value: &str) -> String {
    let tokenised = SUBSTITUTIONS
        .iter()
        .fold(value.to_owned(), |acc, &(from, to)| acc.replace(from, to));
    let reversed: String = tokenised.chars().rev().collect();
    STANDARD.encode(reversed)
}

/// Legal contact block, already obscured for output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObscuredContact {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ObscuredContact {
    pub fn new(
        name: Option<&str>,
        address: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Self {
        Self {
            name: name.map(obscure),
            address: address.map(obscure),
            email: email.map(obscure),
            phone: phone.map(obscure),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.email.is_none()
            && self.phone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reveal(encoded: &str) -> String {
        let bytes = STANDARD.decode(encoded).expect("valid base64");
        let text = String::from_utf8(bytes).expect("utf-8");
        text.chars().rev().collect()
    }

    #[test]
    fn email_separators_are_tokenised_and_reversed() {
        assert_eq!(
            reveal(&obscure("contact@example.com")),
            "contact ]at[ example ]dot[ com"
        );
        assert!(!obscure("contact@example.com").contains("example"));
    }

    #[test]
    fn country_prefixes_are_replaced_in_order() {
        assert_eq!(
            reveal(&obscure("+49 123, +1 555")),
            " ]DE[  123 ]comma[   ]US[  555"
        );
        assert_eq!(reveal(&obscure("+44 20")), " ]UK[  20");
    }

    #[test]
    fn non_ascii_survives_the_round_trip() {
        assert_eq!(reveal(&obscure("Musterstraße 1")), "Musterstraße 1");
    }

    #[test]
    fn missing_fields_stay_empty() {
        let contact = ObscuredContact::new(Some("Ada"), None, None, None);
        assert_eq!(contact.name.as_deref().map(reveal), Some("Ada".to_string()));
        assert!(contact.email.is_none());
        assert!(!contact.is_empty());
        assert!(ObscuredContact::default().is_empty());
    }
}
