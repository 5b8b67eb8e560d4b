pub mod allocator;
pub mod booking;
pub mod rebalance;
pub mod scoring;
pub mod store;
pub mod supabase_store;

pub use allocator::{SlotAllocatorService, SlotSuggester, rank_suggestions};
pub use booking::AppointmentBookingService;
pub use rebalance::RebalanceService;
pub use scoring::ScoreFactors;
pub use store::{AppointmentWriter, InMemorySchedulingStore, SchedulingStore};
pub use supabase_store::SupabaseSchedulingStore;
