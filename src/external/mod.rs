pub mod eastmoney;
pub mod etf_kline;
pub mod fallback_provider;
pub mod mock_provider;
pub mod nav_provider;
