mod news_flow;
mod search_flow;
