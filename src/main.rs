fn main() {
    escapement::native_main();
}
