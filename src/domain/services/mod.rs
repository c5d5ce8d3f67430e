pub mod filter_planner;
pub mod normalizer;
pub mod server_selector;

pub use filter_planner::{
    apply_movie_filter, comic_filter_response, plan_comic_filter, plan_movie_filter,
    ComicFilterPlan, ComicFilterQuery, MovieFilterPlan, MovieFilterQuery, UpstreamPlan,
};
pub use normalizer::{normalize_detail, normalize_list, normalize_terms, resolve_image_url};
pub use server_selector::{initial_episode, select_best_server};
