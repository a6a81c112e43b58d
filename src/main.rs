fn main() {
    std::process::exit(playdeck_lib::run());
}
