pub fn execute() {
    println!("thermoelast {}", crate::VERSION);
}
