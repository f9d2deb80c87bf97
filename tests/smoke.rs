//! Basic smoke test to verify the public surface is wired up.

#[test]
fn crate_compiles() {
    let _ = std::any::type_name::<keyward::KeywardConfig>();
    let _ = std::any::type_name::<keyward::KeywardError>();
    let _ = std::any::type_name::<keyward::ValidationSession>();
}

#[test]
fn default_config_is_valid() {
    keyward::KeywardConfig::default().validate().unwrap();
}
