pub mod track_end;
