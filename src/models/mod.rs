mod restaurant;

pub use restaurant::{NewRestaurant, Plan, Restaurant, RestaurantPatch};
