fn main() {
    kapok::run_cli();
}
