pub mod calendar;
pub mod feed;
pub mod pattern;
pub mod stop;
pub mod trip;
pub mod trip_on_service_date;
pub mod trip_times;
