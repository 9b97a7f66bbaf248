fn main() {
    // Host builds (library + tests) have nothing to generate; the ESP-IDF
    // sysenv is only needed when linking the firmware binary.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
