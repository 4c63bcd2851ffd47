fn main() {
    mylatitude::run();
}
