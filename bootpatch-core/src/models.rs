//! Model identifiers the firmware builder knows how to target.

/// Models a payload can be built for without the native-model override.
pub const SUPPORTED_MODELS: &[&str] = &[
    "MacBook4,1",
    "MacBook5,1",
    "MacBook5,2",
    "MacBook6,1",
    "MacBook7,1",
    "MacBookAir2,1",
    "MacBookAir3,1",
    "MacBookAir3,2",
    "MacBookAir4,1",
    "MacBookAir4,2",
    "MacBookAir5,1",
    "MacBookAir5,2",
    "MacBookAir6,1",
    "MacBookAir6,2",
    "MacBookPro4,1",
    "MacBookPro5,1",
    "MacBookPro5,2",
    "MacBookPro5,3",
    "MacBookPro5,4",
    "MacBookPro5,5",
    "MacBookPro6,1",
    "MacBookPro6,2",
    "MacBookPro7,1",
    "MacBookPro9,1",
    "MacBookPro9,2",
    "MacBookPro10,1",
    "MacBookPro10,2",
    "MacBookPro11,1",
    "MacBookPro11,2",
    "MacBookPro11,3",
    "Macmini3,1",
    "Macmini4,1",
    "Macmini5,1",
    "Macmini5,2",
    "Macmini5,3",
    "Macmini6,1",
    "Macmini6,2",
    "iMac7,1",
    "iMac8,1",
    "iMac9,1",
    "iMac10,1",
    "iMac11,1",
    "iMac11,2",
    "iMac11,3",
    "iMac12,1",
    "iMac12,2",
    "iMac13,1",
    "iMac13,2",
    "iMac13,3",
    "iMac14,1",
    "iMac14,2",
    "iMac14,3",
    "iMac14,4",
    "MacPro3,1",
    "MacPro4,1",
    "MacPro5,1",
    "Xserve3,1",
];

pub fn is_supported(model: &str) -> bool {
    SUPPORTED_MODELS.contains(&model)
}

/// Choices offered by the model picker: every supported model, plus the
/// detected model when it is not already listed.
pub fn model_choices(detected_model: &str) -> Vec<String> {
    let mut choices: Vec<String> = SUPPORTED_MODELS.iter().map(|m| m.to_string()).collect();
    if !is_supported(detected_model) {
        choices.push(detected_model.to_string());
    }
    choices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detected_model_appended_only_when_missing() {
        let choices = model_choices("iMac14,2");
        assert_eq!(choices.len(), SUPPORTED_MODELS.len());

        let choices = model_choices("MacBookPro8,1");
        assert_eq!(choices.len(), SUPPORTED_MODELS.len() + 1);
        assert_eq!(choices.last().map(String::as_str), Some("MacBookPro8,1"));
    }
}
