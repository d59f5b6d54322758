//! A second bring-up is a fatal error

mod common;

#[test]
#[should_panic(expected = "bsp::init: board already initialized (board hosted)")]
fn test_second_init_is_fatal() {
    let config = common::hosted_board(false);
    unsafe {
        ironboard_bsp::init(config);
        ironboard_bsp::init(config);
    }
}
