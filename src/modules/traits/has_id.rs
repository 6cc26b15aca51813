pub trait HasIdTrait {
    fn get_id(&self) -> i32;
}
